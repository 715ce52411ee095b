//! Line grouping.

use crate::geometry::{Line, Word};

/// Vertical distance, in layout units, under which two words share a line.
pub const LINE_TOLERANCE: f32 = 2.0;

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

/// Clusters unordered words into lines, top to bottom.
///
/// Words are sorted by `(round(top, 1), x0)` and walked once; a word opens a new
/// line when its rounded top is more than [`LINE_TOLERANCE`] away from the anchor
/// of the current line. Placement is never revisited.
pub fn group_lines(mut words: Vec<Word>) -> Vec<Line> {
    words.sort_by(|a, b| {
        round1(a.top)
            .total_cmp(&round1(b.top))
            .then(a.x0.total_cmp(&b.x0))
    });

    let mut lines: Vec<Line> = Vec::new();
    for word in words {
        let top = round1(word.top);
        match lines.last_mut() {
            Some(line) if (top - line.top).abs() <= LINE_TOLERANCE => line.words.push(word),
            _ => lines.push(Line {
                top,
                words: vec![word],
            }),
        }
    }

    // a line may span tops within the tolerance, so restore left-to-right order
    for line in &mut lines {
        line.words.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(x0: f32, top: f32, text: &str) -> Word {
        Word::new(x0, top, 20.0, 10.0, "Helvetica", 10.0, text)
    }

    fn texts(lines: &[Line]) -> Vec<Vec<&str>> {
        lines
            .iter()
            .map(|l| l.words.iter().map(|w| w.text.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_groups_and_orders() {
        let lines = group_lines(vec![
            word(205.0, 100.0, "España"),
            word(50.0, 120.0, "NIF:"),
            word(50.0, 100.0, "Cliente:"),
            word(95.0, 120.0, "A12345678"),
            word(155.0, 100.0, "KFC"),
        ]);
        assert_eq!(
            texts(&lines),
            vec![vec!["Cliente:", "KFC", "España"], vec!["NIF:", "A12345678"]]
        );
        assert_eq!(lines[0].top, 100.0);
        assert_eq!(lines[1].top, 120.0);
    }

    #[test]
    fn test_tolerance_boundary() {
        // exactly 2.0 apart joins, 2.1 apart splits
        let lines = group_lines(vec![word(10.0, 100.0, "a"), word(40.0, 102.0, "b")]);
        assert_eq!(lines.len(), 1);

        let lines = group_lines(vec![word(10.0, 100.0, "a"), word(40.0, 102.1, "b")]);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_anchor_is_first_word_of_line() {
        // 101.5 joins the 100.0 anchor, 103.0 is measured against 100.0 too
        let lines = group_lines(vec![
            word(10.0, 100.0, "a"),
            word(20.0, 101.5, "b"),
            word(30.0, 103.0, "c"),
        ]);
        assert_eq!(texts(&lines), vec![vec!["a", "b"], vec!["c"]]);
    }

    #[test]
    fn test_words_within_tolerance_are_left_to_right() {
        let lines = group_lines(vec![word(200.0, 100.0, "right"), word(50.0, 101.0, "left")]);
        assert_eq!(texts(&lines), vec![vec!["left", "right"]]);
    }

    #[test]
    fn test_rounding_applies_before_comparison() {
        // 102.04 rounds to 102.0, within tolerance of 100.0
        let lines = group_lines(vec![word(10.0, 100.0, "a"), word(40.0, 102.04, "b")]);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_lines(Vec::new()).is_empty());
    }
}
