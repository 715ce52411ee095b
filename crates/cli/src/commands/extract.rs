use anyhow::{Context, Result};
use docanon_core::PdfOptions;
use std::fs;
use std::path::Path;

pub fn handle(input: &Path, output: Option<&Path>, ocr: bool) -> Result<()> {
    let options = PdfOptions {
        use_ocr: ocr,
        verify: false,
    };
    let (layout, strategy) = docanon_pdf::extract_layout(input, &options)
        .with_context(|| format!("extracting {}", input.display()))?;
    let xml = docanon_pdf::write_layout(&layout)?;

    match output {
        Some(path) => {
            fs::write(path, xml).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(
                "{} words from {} via {} written to {}",
                layout.word_count(),
                input.display(),
                strategy,
                path.display()
            );
        }
        None => println!("{}", xml),
    }
    Ok(())
}
