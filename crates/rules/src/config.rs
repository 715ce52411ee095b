//! YAML rule source loading.

use crate::{
    ConfigError, Customer, RegexRule, ReplacementType, RuleSet, DEFAULT_CUSTOMER_REPLACEMENT,
    DEFAULT_MASK,
};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RawConfig {
    knowledge_base: Option<RawKnowledgeBase>,
    exact_replacements: Option<Mapping>,
    regex_replacements: Option<Vec<RawRegexRule>>,
}

#[derive(Debug, Deserialize)]
struct RawKnowledgeBase {
    customers: Option<Vec<RawCustomer>>,
}

#[derive(Debug, Deserialize)]
struct RawCustomer {
    name: Option<String>,
    aliases: Option<Vec<String>>,
    replacement: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRegexRule {
    pattern: String,
    replacement_type: Option<String>,
    replacement_value: Option<String>,
}

impl RuleSet {
    /// Loads a rule set from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = Self::from_yaml_str(&raw)?;
        log::info!(
            "[Rules] loaded {} customers, {} exact, {} regex from {}",
            rules.customers.len(),
            rules.exact_replacements.len(),
            rules.regex_replacements.len(),
            path.display()
        );
        Ok(rules)
    }

    /// Parses a rule set from YAML text.
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: RawConfig = serde_yaml::from_str(raw)?;

        let customers = config
            .knowledge_base
            .and_then(|kb| kb.customers)
            .unwrap_or_default()
            .into_iter()
            .map(|c| Customer {
                name: c.name.unwrap_or_default(),
                aliases: c.aliases.unwrap_or_default(),
                replacement: c
                    .replacement
                    .unwrap_or_else(|| DEFAULT_CUSTOMER_REPLACEMENT.to_string()),
            })
            .collect();

        let exact_replacements = match config.exact_replacements {
            Some(mapping) => exact_pairs(mapping)?,
            None => Vec::new(),
        };

        let regex_replacements = config
            .regex_replacements
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, r)| {
                let replacement_type =
                    ReplacementType::parse(r.replacement_type.as_deref().unwrap_or("mask"));
                if let ReplacementType::Unrecognized(kind) = &replacement_type {
                    log::warn!(
                        "[Rules] regex rule #{} declares replacement_type `{}`, applying mask",
                        index,
                        kind
                    );
                }
                RegexRule::new(
                    r.pattern,
                    replacement_type,
                    r.replacement_value
                        .unwrap_or_else(|| DEFAULT_MASK.to_string()),
                )
            })
            .collect();

        Ok(Self {
            customers,
            exact_replacements,
            regex_replacements,
        })
    }
}

// serde_yaml::Mapping keeps document order, which defines substitution order.
fn exact_pairs(mapping: Mapping) -> Result<Vec<(String, String)>, ConfigError> {
    mapping
        .into_iter()
        .map(|(key, value)| match (key, value) {
            (Value::String(k), Value::String(v)) => Ok((k, v)),
            (k, v) => Err(ConfigError::Invalid(format!(
                "exact_replacements entries must map text to text, found {:?} -> {:?}",
                k, v
            ))),
        })
        .collect()
}
