//! Layout-preserving anonymization core.
//!
//! The stages here are pure: words come in through an [`Extractor`], are grouped
//! into lines, rewritten by the rule engine, reflowed over their original boxes,
//! fitted and handed to a [`Renderer`].

pub mod document;
pub mod fit;
pub mod geometry;
pub mod grouping;
pub mod metrics;
pub mod pipeline;
pub mod reflow;

pub use document::{Anonymized, Document, Paragraph};
pub use geometry::{Layout, Line, Page, PageWords, Word};
pub use metrics::{FontMetrics, StandardFont, StandardFonts};
pub use pipeline::{
    AnonymizeOutcome, Extractor, LayoutCheck, PdfOptions, Pipeline, Renderer, Strategy, StrategyKind,
};

pub use docanon_rules::{ConfigError, RuleError, RuleSet, Substitution};

use std::fmt;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of an extraction collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("cannot read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
    #[error("no extractable text in {0}")]
    NoText(PathBuf),
    #[error("geometry source not found: {0}")]
    MissingSource(PathBuf),
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}

/// Failure of a rendering collaborator.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("render backend error: {0}")]
    Backend(String),
    #[error("layout has no pages")]
    EmptyLayout,
}

/// One failed attempt of the strategy fallback list.
#[derive(Debug)]
pub struct StrategyFailure {
    pub strategy: String,
    pub cause: Box<Error>,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.cause)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("all extraction strategies failed: [{}]", join_failures(.0))]
    StrategiesExhausted(Vec<StrategyFailure>),
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed document: {0}")]
    Malformed(String),
}

fn join_failures(failures: &[StrategyFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
