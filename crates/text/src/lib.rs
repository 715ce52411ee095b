//! 流式文本格式脱敏
//!
//! DOCX、纯文本与 Markdown 以段落为粒度经过替换引擎，不涉及版面几何。

mod docx;
mod plain;

pub use docx::DocxDocument;
pub use plain::TextDocument;

use docanon_core::{AnonymizeOutcome, Document, Error, Result, RuleSet};
use docanon_verify::verify_text;
use std::fs;
use std::path::Path;

/// Extensions handled by this crate, lowercase.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["docx", "txt", "md"];

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Whether `path` has a flowed-text extension.
pub fn is_supported(path: &Path) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension(path).as_str())
}

/// 根据扩展名选择处理器并加载文档
pub fn load_document(path: &Path) -> Result<Box<dyn Document>> {
    match extension(path).as_str() {
        "docx" => Ok(Box::new(DocxDocument::load(path)?)),
        "txt" | "md" => Ok(Box::new(TextDocument::load(path)?)),
        other => Err(Error::UnsupportedFormat(if other.is_empty() {
            path.display().to_string()
        } else {
            format!(".{other}")
        })),
    }
}

/// Anonymizes one flowed-text document with an already loaded rule set.
///
/// With `verify` the written file is read back and searched for logged originals.
pub fn anonymize_document(
    input: &Path,
    output: &Path,
    rules: &RuleSet,
    verify: bool,
) -> Result<AnonymizeOutcome> {
    let result = load_document(input)?.anonymize(rules)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| Error::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(output, &result.bytes).map_err(|source| Error::Io {
        path: output.to_path_buf(),
        source,
    })?;
    log::info!(
        "[Text] wrote {} ({} substitutions)",
        output.display(),
        result.log.len()
    );

    let mut warnings = Vec::new();
    if verify {
        let paragraphs = load_document(output)?.paragraphs()?;
        warnings = verify_text(paragraphs.iter().map(|p| p.text.as_str()), &result.log).warnings;
        for warning in &warnings {
            log::warn!("[Verify] {}", warning);
        }
    }

    Ok(AnonymizeOutcome {
        log: result.log,
        warnings,
        strategy: None,
    })
}

/// Loads the rules at `config_path` and anonymizes one flowed-text document.
pub fn anonymize_document_text(input: &Path, output: &Path, config_path: &Path) -> Result<()> {
    let rules = RuleSet::load(config_path)?;
    anonymize_document(input, output, &rules, false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = r#"
knowledge_base:
  customers:
    - name: "Ayuntamiento de Barcelona"
      aliases: ["Ajuntament de Barcelona"]
      replacement: "Entidad Pública"
exact_replacements:
  "KFC": "ABC S.A."
"#;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported(Path::new("a/Contrato.DOCX")));
        assert!(is_supported(Path::new("notas.md")));
        assert!(!is_supported(Path::new("factura.pdf")));
        assert!(!is_supported(Path::new("README")));
    }

    #[test]
    fn test_unsupported_format() {
        let err = load_document(Path::new("hoja.xlsx")).err().unwrap();
        assert!(matches!(err, Error::UnsupportedFormat(ref ext) if ext == ".xlsx"));
    }

    #[test]
    fn test_anonymize_document_text_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("rules.yaml");
        fs::write(&config, RULES).unwrap();
        let input = dir.path().join("acta.md");
        fs::write(&input, "# Acta\n\nReunión con Ajuntament de Barcelona y KFC.\n").unwrap();
        let output = dir.path().join("out").join("acta.md");

        anonymize_document_text(&input, &output, &config).unwrap();
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "# Acta\n\nReunión con Entidad Pública y ABC S.A..\n"
        );
    }

    #[test]
    fn test_docx_round_trip_with_verify() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("contrato.docx");
        docx::tests::write_docx(
            &input,
            &[
                ("[Content_Types].xml", "<Types/>"),
                ("word/document.xml", docx::tests::BODY),
            ],
        );
        let output = dir.path().join("contrato.anon.docx");
        let rules = RuleSet::from_yaml_str(RULES).unwrap();

        let outcome = anonymize_document(&input, &output, &rules, true).unwrap();
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.log.last().unwrap().original, "KFC");

        let reread = load_document(&output).unwrap().paragraphs().unwrap();
        assert_eq!(reread[0].text, "Cliente: ABC S.A. España");
    }

    #[test]
    fn test_missing_config_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.txt");
        fs::write(&input, "KFC").unwrap();
        let output = dir.path().join("b.txt");
        let err =
            anonymize_document_text(&input, &output, &dir.path().join("none.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!output.exists());
    }
}
