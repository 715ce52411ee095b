pub mod anonymize;
pub mod extract;
pub mod text;
pub mod watch;

use docanon_core::{AnonymizeOutcome, Error, PdfOptions, RuleSet};
use std::path::Path;

pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Routes a document to the PDF pipeline or the flowed-text handlers by extension.
pub fn process_document(
    input: &Path,
    output: &Path,
    rules: &RuleSet,
    options: &PdfOptions,
) -> docanon_core::Result<AnonymizeOutcome> {
    if is_pdf(input) {
        docanon_pdf::anonymize_pdf(input, output, rules, options)
    } else if docanon_text::is_supported(input) {
        docanon_text::anonymize_document(input, output, rules, options.verify)
    } else {
        Err(Error::UnsupportedFormat(input.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(Path::new("a/b.PDF")));
        assert!(!is_pdf(Path::new("a/pdf")));
        assert!(!is_pdf(Path::new("a.docx")));
    }

    #[test]
    fn test_unsupported_document() {
        let err = process_document(
            Path::new("x.odt"),
            Path::new("y.odt"),
            &RuleSet::new(),
            &PdfOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }
}
