//! PDF anonymization.
//!
//! Wires the direct content-stream extractor and the OCR sidecar into the core
//! pipeline, renders with base-14 fonts and checks the result by text search.

mod extract;
mod interchange;
mod sidecar;
mod utils;

pub use extract::{extract_document, ContentStreamExtractor};
pub use interchange::{read_layout, write_layout, XmlError};
pub use sidecar::{sidecar_path, SidecarExtractor, SIDECAR_SUFFIX};

use docanon_core::{
    AnonymizeOutcome, Layout, PdfOptions, Pipeline, Result, RuleSet, Strategy, StrategyKind,
};
use docanon_render::PdfRenderer;
use docanon_verify::TextSearchCheck;
use std::path::Path;

pub const DIRECT_STRATEGY: &str = "direct";
pub const OCR_STRATEGY: &str = "ocr-sidecar";

/// Direct extraction first, then OCR sidecar geometry.
pub fn default_pipeline() -> Pipeline {
    Pipeline::new(PdfRenderer)
        .with_strategy(Strategy::new(
            DIRECT_STRATEGY,
            StrategyKind::Direct,
            ContentStreamExtractor,
        ))
        .with_strategy(Strategy::new(
            OCR_STRATEGY,
            StrategyKind::Ocr,
            SidecarExtractor,
        ))
        .with_check(TextSearchCheck)
}

/// Anonymizes one PDF with an already loaded rule set.
pub fn anonymize_pdf(
    input: &Path,
    output: &Path,
    rules: &RuleSet,
    options: &PdfOptions,
) -> Result<AnonymizeOutcome> {
    default_pipeline().run(input, output, rules, options)
}

/// Loads the rules at `config_path` and anonymizes one PDF.
pub fn anonymize_pdf_document(
    input: &Path,
    output: &Path,
    config_path: &Path,
    options: &PdfOptions,
) -> Result<()> {
    let rules = RuleSet::load(config_path)?;
    anonymize_pdf(input, output, &rules, options)?;
    Ok(())
}

/// Grouped geometry of a PDF, as the pipeline would see it.
pub fn extract_layout(input: &Path, options: &PdfOptions) -> Result<(Layout, String)> {
    default_pipeline().extract(input, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docanon_core::Error;
    use docanon_core::{Line, Page, Word};

    const RULES: &str = r#"
knowledge_base:
  customers:
    - name: "Ayuntamiento de Barcelona"
      replacement: "Entidad Pública"
exact_replacements:
  "KFC": "ABC S.A."
regex_replacements:
  - pattern: '\b\d{8}[A-Z]\b'
    replacement_type: mask
    replacement_value: "***"
"#;

    fn source_layout() -> Layout {
        Layout {
            pages: vec![Page {
                index: 0,
                width: 595.0,
                height: 842.0,
                lines: vec![
                    Line {
                        top: 100.0,
                        words: vec![
                            Word::new(50.0, 100.0, 60.0, 12.0, "Helvetica", 12.0, "Cliente:"),
                            Word::new(120.0, 100.0, 40.0, 12.0, "Helvetica", 12.0, "KFC"),
                            Word::new(170.0, 100.0, 60.0, 12.0, "Helvetica", 12.0, "España"),
                        ],
                    },
                    Line {
                        top: 130.0,
                        words: vec![
                            Word::new(50.0, 130.0, 40.0, 12.0, "Helvetica", 12.0, "NIF:"),
                            Word::new(95.0, 130.0, 80.0, 12.0, "Helvetica", 12.0, "12345678Z"),
                        ],
                    },
                ],
            }],
        }
    }

    fn write_source(dir: &Path) -> std::path::PathBuf {
        let input = dir.join("factura.pdf");
        let bytes = docanon_render::render_layout(&source_layout()).unwrap();
        std::fs::write(&input, bytes).unwrap();
        input
    }

    #[test]
    fn test_pdf_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_source(dir.path());
        let output = dir.path().join("out").join("factura.pdf");
        let rules = RuleSet::from_yaml_str(RULES).unwrap();
        let options = PdfOptions {
            use_ocr: false,
            verify: true,
        };

        let outcome = anonymize_pdf(&input, &output, &rules, &options).unwrap();
        assert_eq!(outcome.strategy.as_deref(), Some(DIRECT_STRATEGY));
        assert!(outcome.warnings.is_empty());
        let originals: Vec<&str> = outcome.log.iter().map(|s| s.original.as_str()).collect();
        assert_eq!(originals, vec!["KFC", "12345678Z"]);

        // fitted boxes re-extract with their own sizes, so compare the words only
        let (layout, _) = extract_layout(&output, &PdfOptions::default()).unwrap();
        let words: Vec<String> = layout
            .lines()
            .flat_map(|l| l.words.iter().map(|w| w.text.clone()))
            .collect();
        for expected in ["Cliente:", "ABC", "S.A.", "España", "NIF:", "***"] {
            assert!(words.iter().any(|w| w == expected), "missing {expected}: {words:?}");
        }
        assert!(!words.iter().any(|w| w.contains("KFC") || w.contains("12345678Z")));
    }

    #[test]
    fn test_sidecar_is_used_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_source(dir.path());
        let mut ocr = source_layout();
        ocr.pages[0].lines[1].words[1].text = "87654321X".to_string();
        std::fs::write(sidecar_path(&input), write_layout(&ocr).unwrap()).unwrap();

        let output = dir.path().join("ocr.pdf");
        let rules = RuleSet::from_yaml_str(RULES).unwrap();
        let options = PdfOptions {
            use_ocr: true,
            verify: false,
        };
        let outcome = anonymize_pdf(&input, &output, &rules, &options).unwrap();
        assert_eq!(outcome.strategy.as_deref(), Some(OCR_STRATEGY));
        assert_eq!(outcome.log[1].original, "87654321X");
    }

    #[test]
    fn test_unreadable_pdf_exhausts_strategies() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.pdf");
        std::fs::write(&input, b"%PDF-1.4 garbage").unwrap();
        let output = dir.path().join("out.pdf");

        let err = anonymize_pdf(&input, &output, &RuleSet::new(), &PdfOptions::default())
            .unwrap_err();
        match err {
            Error::StrategiesExhausted(failures) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].strategy, DIRECT_STRATEGY);
                assert_eq!(failures[1].strategy, OCR_STRATEGY);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_config_aborts_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.pdf");
        let err = anonymize_pdf_document(
            &dir.path().join("missing.pdf"),
            &output,
            &dir.path().join("rules.yaml"),
            &PdfOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!output.exists());
    }
}
