//! Token reflow: spread a substituted line over the original word boxes.
//!
//! Box count and geometry never change, only `text`. Widths are ignored here;
//! making each string fit is the job of [`crate::fit`].

use crate::geometry::Word;

/// Number of tokens each of `boxes` receives when `tokens` are spread over them.
///
/// With fewer tokens than boxes the trailing boxes get zero. With more, every box
/// gets `tokens / boxes` and the first `tokens % boxes` boxes one extra.
pub fn distribution(tokens: usize, boxes: usize) -> Vec<usize> {
    if boxes == 0 {
        return Vec::new();
    }
    if tokens <= boxes {
        return (0..boxes).map(|i| usize::from(i < tokens)).collect();
    }
    let base = tokens / boxes;
    let remainder = tokens % boxes;
    (0..boxes)
        .map(|i| base + usize::from(i < remainder))
        .collect()
}

/// Assigns the whitespace tokens of `new_text` to `words` in order.
pub fn reflow_line(words: &mut [Word], new_text: &str) {
    let tokens: Vec<&str> = new_text.split_whitespace().collect();
    let counts = distribution(tokens.len(), words.len());

    let mut cursor = 0;
    for (word, take) in words.iter_mut().zip(counts) {
        word.text = tokens[cursor..cursor + take].join(" ");
        cursor += take;
    }

    if cursor < tokens.len() {
        log::warn!(
            "[Reflow] {} tokens left unassigned on a line without boxes",
            tokens.len() - cursor
        );
    }
}
