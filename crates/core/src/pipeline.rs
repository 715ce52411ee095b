//! 流水线编排
//!
//! `Extract → Group → Substitute → Reflow → Fit → Render`。提取与渲染通过
//! trait 注入，核心阶段不做任何 I/O。提取策略按顺序各尝试一次。

use crate::fit::fit_layout;
use crate::geometry::{Layout, PageWords};
use crate::metrics::{FontMetrics, StandardFonts};
use crate::reflow::reflow_line;
use crate::{Error, ExtractionError, RenderError, Result, StrategyFailure};
use docanon_rules::{RuleSet, Substitution};
use serde::Serialize;
use std::path::Path;

/// Produces unordered words per page from a source document.
pub trait Extractor: Send + Sync {
    fn extract(&self, input: &Path) -> std::result::Result<Vec<PageWords>, ExtractionError>;
}

/// Serializes a fitted layout into an output document.
pub trait Renderer: Send + Sync {
    fn render(&self, layout: &Layout) -> std::result::Result<Vec<u8>, RenderError>;
}

/// Post-processing check over the final layout. Returns warnings, never fails.
pub trait LayoutCheck: Send + Sync {
    fn check(&self, layout: &Layout, log: &[Substitution]) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Geometry read straight from the document.
    Direct,
    /// Geometry supplied by an OCR tool.
    Ocr,
}

pub struct Strategy {
    pub name: String,
    pub kind: StrategyKind,
    pub extractor: Box<dyn Extractor>,
}

impl Strategy {
    pub fn new(name: impl Into<String>, kind: StrategyKind, extractor: impl Extractor + 'static) -> Self {
        Self {
            name: name.into(),
            kind,
            extractor: Box::new(extractor),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PdfOptions {
    /// Try OCR-supplied geometry before direct extraction.
    pub use_ocr: bool,
    /// Run the layout checks after fitting.
    pub verify: bool,
}

/// What a successful run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnonymizeOutcome {
    pub log: Vec<Substitution>,
    pub warnings: Vec<String>,
    /// Name of the strategy whose geometry was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

/// Runs the substitution, reflow and fit stages over `layout` in place.
pub fn process_layout(
    layout: &mut Layout,
    rules: &RuleSet,
    metrics: &dyn FontMetrics,
) -> Result<Vec<Substitution>> {
    let mut log = Vec::new();
    for page in &mut layout.pages {
        for line in &mut page.lines {
            let original = line.text();
            let (text, entries) = rules.anonymize(&original)?;
            if text != original {
                reflow_line(&mut line.words, &text);
            }
            log.extend(entries);
        }
    }
    fit_layout(metrics, layout);
    Ok(log)
}

pub struct Pipeline {
    strategies: Vec<Strategy>,
    renderer: Box<dyn Renderer>,
    metrics: Box<dyn FontMetrics>,
    checks: Vec<Box<dyn LayoutCheck>>,
}

impl Pipeline {
    pub fn new(renderer: impl Renderer + 'static) -> Self {
        Self {
            strategies: Vec::new(),
            renderer: Box::new(renderer),
            metrics: Box::new(StandardFonts),
            checks: Vec::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn with_metrics(mut self, metrics: impl FontMetrics + 'static) -> Self {
        self.metrics = Box::new(metrics);
        self
    }

    pub fn with_check(mut self, check: impl LayoutCheck + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Strategy order for one run: OCR strategies first when requested, registration order otherwise.
    fn ordered(&self, options: &PdfOptions) -> Vec<&Strategy> {
        let mut ordered: Vec<&Strategy> = self.strategies.iter().collect();
        if options.use_ocr {
            // stable sort keeps registration order within each kind
            ordered.sort_by_key(|s| s.kind != StrategyKind::Ocr);
        }
        ordered
    }

    /// Tries each strategy once, in order, until `attempt` succeeds.
    ///
    /// Extraction and render failures move on to the next strategy; any other
    /// error aborts the document.
    fn first_success<T>(
        &self,
        input: &Path,
        options: &PdfOptions,
        mut attempt: impl FnMut(&Strategy) -> Result<T>,
    ) -> Result<(T, &Strategy)> {
        let mut failures = Vec::new();

        for strategy in self.ordered(options) {
            log::info!("[Pipeline] {}: trying strategy `{}`", input.display(), strategy.name);
            match attempt(strategy) {
                Ok(value) => return Ok((value, strategy)),
                Err(cause @ (Error::Extraction(_) | Error::Render(_))) => {
                    log::warn!("[Pipeline] strategy `{}` failed: {}", strategy.name, cause);
                    failures.push(StrategyFailure {
                        strategy: strategy.name.clone(),
                        cause: Box::new(cause),
                    });
                }
                Err(other) => return Err(other),
            }
        }

        Err(Error::StrategiesExhausted(failures))
    }

    /// Extracts and groups the geometry of `input` without changing it.
    pub fn extract(&self, input: &Path, options: &PdfOptions) -> Result<(Layout, String)> {
        let (pages, strategy) = self.first_success(input, options, |strategy| {
            Ok(strategy.extractor.extract(input)?)
        })?;
        Ok((Layout::from_pages(pages), strategy.name.clone()))
    }

    /// Anonymizes `input` into `output`. Nothing is written unless a strategy renders successfully.
    pub fn run(
        &self,
        input: &Path,
        output: &Path,
        rules: &RuleSet,
        options: &PdfOptions,
    ) -> Result<AnonymizeOutcome> {
        let ((bytes, mut outcome), strategy) = self.first_success(input, options, |strategy| {
            self.run_strategy(strategy, input, rules, options)
        })?;

        write_output(output, &bytes)?;
        log::info!(
            "[Pipeline] {} -> {} ({} substitutions)",
            input.display(),
            output.display(),
            outcome.log.len()
        );
        outcome.strategy = Some(strategy.name.clone());
        Ok(outcome)
    }

    fn run_strategy(
        &self,
        strategy: &Strategy,
        input: &Path,
        rules: &RuleSet,
        options: &PdfOptions,
    ) -> Result<(Vec<u8>, AnonymizeOutcome)> {
        let pages = strategy.extractor.extract(input)?;
        let mut layout = Layout::from_pages(pages);
        log::debug!(
            "[Pipeline] {} pages, {} words",
            layout.pages.len(),
            layout.word_count()
        );

        let log = process_layout(&mut layout, rules, self.metrics.as_ref())?;

        let mut warnings = Vec::new();
        if options.verify {
            for check in &self.checks {
                warnings.extend(check.check(&layout, &log));
            }
            for warning in &warnings {
                log::warn!("[Verify] {}", warning);
            }
        }

        let bytes = self.renderer.render(&layout)?;
        Ok((
            bytes,
            AnonymizeOutcome {
                log,
                warnings,
                strategy: None,
            },
        ))
    }
}

fn write_output(output: &Path, bytes: &[u8]) -> Result<()> {
    let io_err = |source| Error::Io {
        path: output.to_path_buf(),
        source,
    };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(output, bytes).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Word;
    use docanon_rules::{Customer, RegexRule, ReplacementType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn kfc_page() -> PageWords {
        PageWords {
            index: 0,
            width: 595.0,
            height: 842.0,
            words: vec![
                Word::new(205.0, 100.0, 60.0, 12.0, "Helvetica", 12.0, "España"),
                Word::new(50.0, 100.0, 60.0, 12.0, "Helvetica", 12.0, "Cliente:"),
                Word::new(120.0, 100.0, 60.0, 12.0, "Helvetica", 12.0, "KFC"),
                Word::new(50.0, 130.0, 40.0, 12.0, "Helvetica", 12.0, "NIF:"),
                Word::new(95.0, 130.0, 80.0, 12.0, "Helvetica", 12.0, "12345678Z"),
            ],
        }
    }

    fn kfc_rules() -> RuleSet {
        RuleSet {
            exact_replacements: vec![("KFC".to_string(), "ABC S.A.".to_string())],
            regex_replacements: vec![RegexRule::new(r"\d{8}[A-Z]", ReplacementType::Mask, "***")],
            ..RuleSet::default()
        }
    }

    struct Fixed(PageWords);

    impl Extractor for Fixed {
        fn extract(&self, _: &Path) -> std::result::Result<Vec<PageWords>, ExtractionError> {
            Ok(vec![self.0.clone()])
        }
    }

    struct Failing(Arc<AtomicUsize>);

    impl Extractor for Failing {
        fn extract(&self, input: &Path) -> std::result::Result<Vec<PageWords>, ExtractionError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(ExtractionError::NoText(input.to_path_buf()))
        }
    }

    /// Renders every word text, one per line.
    struct Dump;

    impl Renderer for Dump {
        fn render(&self, layout: &Layout) -> std::result::Result<Vec<u8>, RenderError> {
            if layout.pages.is_empty() {
                return Err(RenderError::EmptyLayout);
            }
            let text = layout
                .lines()
                .flat_map(|l| l.words.iter().map(|w| w.text.clone()))
                .collect::<Vec<_>>()
                .join("\n");
            Ok(text.into_bytes())
        }
    }

    struct Broken;

    impl Renderer for Broken {
        fn render(&self, _: &Layout) -> std::result::Result<Vec<u8>, RenderError> {
            Err(RenderError::Backend("disk on fire".into()))
        }
    }

    struct AlwaysWarn;

    impl LayoutCheck for AlwaysWarn {
        fn check(&self, _: &Layout, log: &[Substitution]) -> Vec<String> {
            vec![format!("{} entries seen", log.len())]
        }
    }

    #[test]
    fn test_process_layout_reflows_changed_lines() {
        let mut layout = Layout::from_pages(vec![kfc_page()]);
        let log = process_layout(&mut layout, &kfc_rules(), &StandardFonts).unwrap();

        let first: Vec<&str> = layout.pages[0].lines[0]
            .words
            .iter()
            .map(|w| w.text.as_str())
            .collect();
        // fitting may truncate, but each box starts with its reflowed tokens
        assert_eq!(first.len(), 3);
        assert!(first[0].starts_with("Clien"));
        assert_eq!(first[1], "S.A.");
        assert_eq!(first[2], "España");

        assert_eq!(layout.pages[0].lines[1].words[1].text, "***");
        assert_eq!(
            log,
            vec![
                Substitution::new("KFC", "ABC S.A."),
                Substitution::new("12345678Z", "***"),
            ]
        );
    }

    #[test]
    fn test_unchanged_lines_keep_their_words() {
        let mut layout = Layout::from_pages(vec![PageWords {
            index: 0,
            width: 595.0,
            height: 842.0,
            words: vec![
                Word::new(50.0, 100.0, 100.0, 12.0, "Helvetica", 12.0, "Sin"),
                Word::new(160.0, 100.0, 100.0, 12.0, "Helvetica", 12.0, ""),
                Word::new(270.0, 100.0, 100.0, 12.0, "Helvetica", 12.0, "cambios"),
            ],
        }]);
        let before = layout.clone();
        let log = process_layout(&mut layout, &kfc_rules(), &StandardFonts).unwrap();
        assert!(log.is_empty());
        assert_eq!(layout, before);
    }

    #[test]
    fn test_rule_error_aborts() {
        let rules = RuleSet {
            regex_replacements: vec![RegexRule::new("(", ReplacementType::Mask, "x")],
            ..RuleSet::default()
        };
        let mut layout = Layout::from_pages(vec![kfc_page()]);
        let err = process_layout(&mut layout, &rules, &StandardFonts).unwrap_err();
        assert!(matches!(err, Error::Rule(_)));
    }

    #[test]
    fn test_run_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out").join("doc.pdf");
        let pipeline = Pipeline::new(Dump)
            .with_strategy(Strategy::new("direct", StrategyKind::Direct, Fixed(kfc_page())));

        let outcome = pipeline
            .run(Path::new("in.pdf"), &output, &kfc_rules(), &PdfOptions::default())
            .unwrap();
        assert_eq!(outcome.strategy.as_deref(), Some("direct"));
        assert_eq!(outcome.log.len(), 2);
        assert!(outcome.warnings.is_empty());

        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.contains("S.A."));
        assert!(!written.contains("KFC"));
        assert!(!written.contains("12345678Z"));
    }

    #[test]
    fn test_run_falls_back_to_next_strategy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("doc.pdf");
        let pipeline = Pipeline::new(Dump)
            .with_strategy(Strategy::new("direct", StrategyKind::Direct, Failing(calls.clone())))
            .with_strategy(Strategy::new("ocr", StrategyKind::Ocr, Fixed(kfc_page())));

        let outcome = pipeline
            .run(Path::new("in.pdf"), &output, &kfc_rules(), &PdfOptions::default())
            .unwrap();
        assert_eq!(outcome.strategy.as_deref(), Some("ocr"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_use_ocr_puts_ocr_first() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("doc.pdf");
        let pipeline = Pipeline::new(Dump)
            .with_strategy(Strategy::new("direct", StrategyKind::Direct, Fixed(kfc_page())))
            .with_strategy(Strategy::new("ocr", StrategyKind::Ocr, Failing(calls.clone())));

        let options = PdfOptions {
            use_ocr: true,
            verify: false,
        };
        let outcome = pipeline
            .run(Path::new("in.pdf"), &output, &kfc_rules(), &options)
            .unwrap();
        // ocr was tried once and failed, direct took over
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.strategy.as_deref(), Some("direct"));
    }

    #[test]
    fn test_exhausted_strategies_write_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("doc.pdf");
        let pipeline = Pipeline::new(Broken)
            .with_strategy(Strategy::new("direct", StrategyKind::Direct, Failing(calls.clone())))
            .with_strategy(Strategy::new("ocr", StrategyKind::Ocr, Fixed(kfc_page())));

        let err = pipeline
            .run(Path::new("in.pdf"), &output, &kfc_rules(), &PdfOptions::default())
            .unwrap_err();
        match err {
            Error::StrategiesExhausted(failures) => {
                let names: Vec<&str> = failures.iter().map(|f| f.strategy.as_str()).collect();
                assert_eq!(names, vec!["direct", "ocr"]);
                assert!(matches!(*failures[0].cause, Error::Extraction(_)));
                assert!(matches!(*failures[1].cause, Error::Render(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output.exists());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_strategies_is_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let err = Pipeline::new(Dump)
            .run(
                Path::new("in.pdf"),
                &dir.path().join("doc.pdf"),
                &RuleSet::new(),
                &PdfOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::StrategiesExhausted(f) if f.is_empty()));
    }

    #[test]
    fn test_extract_uses_fallback_without_writing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new(Broken)
            .with_strategy(Strategy::new("direct", StrategyKind::Direct, Failing(calls.clone())))
            .with_strategy(Strategy::new("ocr", StrategyKind::Ocr, Fixed(kfc_page())));

        let (layout, strategy) = pipeline
            .extract(Path::new("in.pdf"), &PdfOptions::default())
            .unwrap();
        assert_eq!(strategy, "ocr");
        assert_eq!(layout.pages[0].lines.len(), 2);
        assert_eq!(layout.pages[0].lines[0].text(), "Cliente: KFC España");
    }

    #[test]
    fn test_checks_run_only_when_verifying() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("doc.pdf");
        let rules = RuleSet {
            customers: vec![Customer {
                name: "KFC".into(),
                aliases: vec![],
                replacement: "[CLIENTE]".into(),
            }],
            ..RuleSet::default()
        };
        let pipeline = Pipeline::new(Dump)
            .with_strategy(Strategy::new("direct", StrategyKind::Direct, Fixed(kfc_page())))
            .with_check(AlwaysWarn);

        let quiet = pipeline
            .run(Path::new("in.pdf"), &output, &rules, &PdfOptions::default())
            .unwrap();
        assert!(quiet.warnings.is_empty());

        let options = PdfOptions {
            use_ocr: false,
            verify: true,
        };
        let checked = pipeline.run(Path::new("in.pdf"), &output, &rules, &options).unwrap();
        assert_eq!(checked.warnings, vec!["1 entries seen".to_string()]);
    }
}
