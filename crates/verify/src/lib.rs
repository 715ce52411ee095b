//! Post-processing verification checks.

use docanon_core::{Layout, LayoutCheck, Substitution};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifyResult {
    pub ok: bool,
    pub warnings: Vec<String>,
}

/// Originals that must be gone from the output.
///
/// An entry whose replacement contains its own original (`A` → `A S.A.`) cannot
/// be checked by a text search and is skipped.
fn searchable(log: &[Substitution]) -> BTreeSet<&str> {
    log.iter()
        .filter(|s| !s.original.is_empty() && !s.replacement.contains(s.original.as_str()))
        .map(|s| s.original.as_str())
        .collect()
}

/// Searches every line of `layout` for logged originals.
pub fn verify_layout(layout: &Layout, log: &[Substitution]) -> VerifyResult {
    let originals = searchable(log);
    let mut warnings = Vec::new();

    for page in &layout.pages {
        for (line_no, line) in page.lines.iter().enumerate() {
            let text = line.text();
            for original in originals.iter().filter(|o| text.contains(**o)) {
                warnings.push(format!(
                    "`{}` still present on page {}, line {}",
                    original,
                    page.index + 1,
                    line_no + 1
                ));
            }
        }
    }

    VerifyResult {
        ok: warnings.is_empty(),
        warnings,
    }
}

/// Same search over flowed text, paragraph by paragraph.
pub fn verify_text<'a>(
    paragraphs: impl IntoIterator<Item = &'a str>,
    log: &[Substitution],
) -> VerifyResult {
    let originals = searchable(log);
    let mut warnings = Vec::new();

    for (index, text) in paragraphs.into_iter().enumerate() {
        for original in originals.iter().filter(|o| text.contains(**o)) {
            warnings.push(format!(
                "`{}` still present in paragraph {}",
                original,
                index + 1
            ));
        }
    }

    VerifyResult {
        ok: warnings.is_empty(),
        warnings,
    }
}

/// Text search check for the PDF pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSearchCheck;

impl LayoutCheck for TextSearchCheck {
    fn check(&self, layout: &Layout, log: &[Substitution]) -> Vec<String> {
        verify_layout(layout, log).warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docanon_core::{Line, Page, Word};

    fn layout(lines: &[&[&str]]) -> Layout {
        Layout {
            pages: vec![Page {
                index: 0,
                width: 595.0,
                height: 842.0,
                lines: lines
                    .iter()
                    .enumerate()
                    .map(|(i, words)| Line {
                        top: 100.0 + 20.0 * i as f32,
                        words: words
                            .iter()
                            .enumerate()
                            .map(|(j, t)| {
                                Word::new(50.0 * j as f32, 100.0, 40.0, 10.0, "Helvetica", 10.0, *t)
                            })
                            .collect(),
                    })
                    .collect(),
            }],
        }
    }

    #[test]
    fn test_clean_layout_passes() {
        let log = vec![Substitution::new("KFC", "ABC S.A.")];
        let result = verify_layout(&layout(&[&["Cliente:", "ABC", "S.A."]]), &log);
        assert_eq!(result, VerifyResult { ok: true, warnings: vec![] });
    }

    #[test]
    fn test_leftover_original_is_reported() {
        // a truncated box can still show the original split across words
        let log = vec![Substitution::new("KFC Spain", "[CLIENTE]")];
        let result = verify_layout(&layout(&[&["ok"], &["de", "KFC", "Spain"]]), &log);
        assert!(!result.ok);
        assert_eq!(result.warnings, vec!["`KFC Spain` still present on page 1, line 2"]);
    }

    #[test]
    fn test_self_containing_replacement_is_skipped() {
        let log = vec![
            Substitution::new("ABC", "ABC S.A."),
            Substitution::new("", "x"),
        ];
        let result = verify_layout(&layout(&[&["ABC", "S.A."]]), &log);
        assert!(result.ok);
    }

    #[test]
    fn test_repeated_log_entries_warn_once_per_line() {
        let log = vec![Substitution::new("a@b.es", "***"), Substitution::new("a@b.es", "***")];
        let warnings = TextSearchCheck.check(&layout(&[&["a@b.es"]]), &log);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_verify_text() {
        let log = vec![Substitution::new("KFC", "[CLIENTE]")];
        let result = verify_text(["[CLIENTE] y socios", "otro KFC"], &log);
        assert_eq!(result.warnings, vec!["`KFC` still present in paragraph 2"]);
    }
}
