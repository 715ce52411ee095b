//! Rule set schema, loading and the substitution engine.

mod config;
mod engine;
pub mod fuzzy;

pub use engine::{anonymize, FUZZY_THRESHOLD};

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;

/// Replacement used when a customer entry does not declare one.
pub const DEFAULT_CUSTOMER_REPLACEMENT: &str = "[CLIENTE]";
/// Replacement used when a regex rule does not declare one.
pub const DEFAULT_MASK: &str = "***";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("rule source not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("cannot read rule source {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed rule source: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid rule source: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RuleError {
    #[error("regex rule #{index} has an invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("customer candidate `{candidate}` cannot be matched: {source}")]
    Candidate {
        candidate: String,
        #[source]
        source: regex::Error,
    },
}

/// 客户知识库条目
///
/// `name` 与 `aliases` 都是候选匹配串，按声明顺序处理。
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub name: String,
    pub aliases: Vec<String>,
    pub replacement: String,
}

impl Customer {
    /// Candidate strings in processing order, empty values skipped.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .filter(|c| !c.is_empty())
    }
}

/// How a regex match is rewritten.
///
/// Only masking exists. Any other declared type is kept verbatim so it can be
/// reported, and is applied with mask semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacementType {
    Mask,
    Unrecognized(String),
}

impl ReplacementType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "mask" => ReplacementType::Mask,
            other => ReplacementType::Unrecognized(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegexRule {
    pub pattern: String,
    pub replacement_type: ReplacementType,
    pub replacement_value: String,
    compiled: OnceCell<Result<Regex, regex::Error>>,
}

impl RegexRule {
    pub fn new(
        pattern: impl Into<String>,
        replacement_type: ReplacementType,
        replacement_value: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            replacement_type,
            replacement_value: replacement_value.into(),
            compiled: OnceCell::new(),
        }
    }

    /// Compiles the pattern on first use and caches the outcome.
    pub(crate) fn regex(&self) -> Result<&Regex, regex::Error> {
        self.compiled
            .get_or_init(|| Regex::new(&self.pattern))
            .as_ref()
            .map_err(Clone::clone)
    }
}

/// 规则集合
///
/// 加载后不可变，可在多个文档、多个线程之间共享。
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub customers: Vec<Customer>,
    /// Literal replacements in declaration order.
    pub exact_replacements: Vec<(String, String)>,
    pub regex_replacements: Vec<RegexRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
            && self.exact_replacements.is_empty()
            && self.regex_replacements.is_empty()
    }

    /// Runs the substitution engine over `text`.
    pub fn anonymize(&self, text: &str) -> Result<(String, Vec<Substitution>), RuleError> {
        engine::anonymize(text, self)
    }
}

/// One entry of the substitution log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Substitution {
    pub original: String,
    pub replacement: String,
}

impl Substitution {
    pub fn new(original: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            replacement: replacement.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_skip_empty_values() {
        let customer = Customer {
            name: String::new(),
            aliases: vec!["KFC".into(), "".into(), "Kentucky".into()],
            replacement: "[CLIENTE]".into(),
        };
        let candidates: Vec<&str> = customer.candidates().collect();
        assert_eq!(candidates, vec!["KFC", "Kentucky"]);
    }

    #[test]
    fn test_replacement_type_parse() {
        assert_eq!(ReplacementType::parse("mask"), ReplacementType::Mask);
        assert_eq!(
            ReplacementType::parse("hash"),
            ReplacementType::Unrecognized("hash".into())
        );
    }

    #[test]
    fn test_regex_compile_error_is_cached() {
        let rule = RegexRule::new("(unclosed", ReplacementType::Mask, "***");
        assert!(rule.regex().is_err());
        assert!(rule.regex().is_err());
    }

    #[test]
    fn test_rule_set_is_send_and_sync() {
        fn assert_shareable<T: Send + Sync>() {}
        assert_shareable::<RuleSet>();
    }
}
