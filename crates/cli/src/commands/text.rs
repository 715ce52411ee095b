use anyhow::{Context, Result};
use std::path::Path;

pub fn handle(input: &Path, json: bool) -> Result<()> {
    let paragraphs = docanon_text::load_document(input)
        .and_then(|doc| doc.paragraphs())
        .with_context(|| format!("reading {}", input.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&paragraphs)?);
    } else {
        for paragraph in &paragraphs {
            println!("{}", paragraph.text);
        }
    }
    tracing::debug!("{} paragraphs in {}", paragraphs.len(), input.display());
    Ok(())
}
