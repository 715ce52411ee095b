use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use docanon_core::{AnonymizeOutcome, PdfOptions, RuleSet, Substitution};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// JSON audit record of one anonymization run.
#[derive(Debug, Serialize)]
pub struct AuditReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rules_sha256: String,
    pub processed_at: String,
    pub strategy: Option<String>,
    pub warnings: Vec<String>,
    pub substitutions: Vec<Substitution>,
}

impl AuditReport {
    pub fn new(input: &Path, output: &Path, rules_sha256: String, outcome: AnonymizeOutcome) -> Self {
        Self {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            rules_sha256,
            processed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            strategy: outcome.strategy,
            warnings: outcome.warnings,
            substitutions: outcome.log,
        }
    }
}

/// SHA-256 of the raw rule file, hex encoded.
pub fn fingerprint(path: &Path) -> Result<String> {
    let raw = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(hex::encode(Sha256::digest(&raw)))
}

pub fn handle(
    config: &Path,
    input: &Path,
    output: &Path,
    ocr: bool,
    verify: bool,
    audit: Option<&Path>,
) -> Result<()> {
    let rules = RuleSet::load(config)?;
    let options = PdfOptions { use_ocr: ocr, verify };

    let outcome = super::process_document(input, output, &rules, &options)
        .with_context(|| format!("anonymizing {}", input.display()))?;

    println!("✓ {} -> {}", input.display(), output.display());
    println!("  Substitutions: {}", outcome.log.len());
    if let Some(strategy) = &outcome.strategy {
        println!("  Strategy: {}", strategy);
    }
    for warning in &outcome.warnings {
        println!("  ⚠ {}", warning);
    }

    if let Some(path) = audit {
        let report = AuditReport::new(input, output, fingerprint(config)?, outcome);
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("writing audit {}", path.display()))?;
        tracing::info!("audit report written to {}", path.display());
    }

    Ok(())
}
