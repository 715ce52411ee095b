//! 文本适配
//!
//! 每个单词框独立处理：先缩小字号，字号到达下限仍放不下时截断并补省略号。
//! 字号和文本长度都只减不增。

use crate::geometry::{Layout, Word};
use crate::metrics::FontMetrics;

/// Smallest font size the adjuster shrinks to.
pub const MIN_FONT_SIZE: f32 = 4.0;
/// Average advance, in em, assumed when the metric service has no answer.
pub const FALLBACK_CHAR_WIDTH: f32 = 0.6;
pub const ELLIPSIS: &str = "...";
/// Space kept free at the right edge of the page.
pub const PAGE_RIGHT_MARGIN: f32 = 5.0;
/// Fixed amount taken off every available width.
pub const FIT_GUTTER: f32 = 1.0;
/// Baseline offset below `top`, as a fraction of the box height.
pub const BASELINE_RATIO: f32 = 0.75;

/// Result of fitting one string.
#[derive(Debug, Clone, PartialEq)]
pub struct Fitted {
    pub text: String,
    pub size: f32,
}

/// Estimated rendered width of `text`.
pub fn estimate_width(metrics: &dyn FontMetrics, text: &str, font: &str, size: f32) -> f32 {
    metrics
        .text_width(text, font, size)
        .unwrap_or_else(|| text.chars().count() as f32 * size * FALLBACK_CHAR_WIDTH)
}

/// Shrinks or truncates `text` so that it fits into `available` units.
pub fn fit_text(
    metrics: &dyn FontMetrics,
    text: &str,
    font: &str,
    size: f32,
    available: f32,
) -> Fitted {
    let available = if available.is_nan() { 0.0 } else { available.max(0.0) };
    let unchanged = || Fitted {
        text: text.to_string(),
        size,
    };

    if text.is_empty() {
        return unchanged();
    }
    let estimated = estimate_width(metrics, text, font, size);
    if estimated <= available {
        return unchanged();
    }

    let floor = MIN_FONT_SIZE.min(size);
    let scaled = size * available / estimated;
    if scaled >= MIN_FONT_SIZE {
        return Fitted {
            text: text.to_string(),
            size: scaled,
        };
    }

    let len = text.chars().count();
    let at_floor = estimate_width(metrics, text, font, floor);
    if at_floor <= 0.0 {
        return unchanged();
    }
    let chars = (len as f32 * available / at_floor).floor() as usize;
    let keep = chars.saturating_sub(ELLIPSIS.len()).max(1);

    let text = if keep + ELLIPSIS.len() < len {
        let mut truncated: String = text.chars().take(keep).collect();
        truncated.push_str(ELLIPSIS);
        truncated
    } else {
        // too short to carry an ellipsis without growing
        text.chars().take(chars.clamp(1, len)).collect()
    };

    Fitted { text, size: floor }
}

/// Width left for `word`: its own box, bounded by the page's right margin, minus the gutter.
pub fn available_width(word: &Word, page_width: f32) -> f32 {
    let to_margin = page_width - PAGE_RIGHT_MARGIN - word.x0;
    let width = word.width.max(0.0).min(to_margin) - FIT_GUTTER;
    if width.is_nan() {
        0.0
    } else {
        width.max(0.0)
    }
}

/// Render baseline of `word` in bottom-left page coordinates.
pub fn baseline(word: &Word, page_height: f32) -> f32 {
    page_height - word.top - word.height * BASELINE_RATIO
}

/// Fits one word in place.
pub fn fit_word(metrics: &dyn FontMetrics, word: &mut Word, page_width: f32) {
    if word.text.is_empty() {
        return;
    }
    let available = available_width(word, page_width);
    let fitted = fit_text(metrics, &word.text, &word.font_name, word.font_size, available);
    if fitted.text != word.text {
        log::debug!(
            "[Fit] truncated `{}` -> `{}` at {:.1}pt",
            word.text,
            fitted.text,
            fitted.size
        );
    }
    word.text = fitted.text;
    word.font_size = fitted.size;
}

/// Fits every word of the layout.
pub fn fit_layout(metrics: &dyn FontMetrics, layout: &mut Layout) {
    for page in &mut layout.pages {
        let page_width = page.width;
        for word in page.lines.iter_mut().flat_map(|l| l.words.iter_mut()) {
            fit_word(metrics, word, page_width);
        }
    }
}
