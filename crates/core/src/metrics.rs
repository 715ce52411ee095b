//! Font metric lookup.
//!
//! Advance widths are in 1/1000 em. [`StandardFonts`] covers the PDF base-14
//! text faces that the renderer can draw without embedding anything.

/// Font-metric service used by the fit stage and the extractor.
pub trait FontMetrics: Send + Sync {
    /// Advance width of `ch` in 1/1000 em, or `None` when the font has no metric for it.
    fn advance(&self, font: &str, ch: char) -> Option<u16>;

    /// Rendered width of `text` at `size`, or `None` when any character lacks a metric.
    fn text_width(&self, text: &str, font: &str, size: f32) -> Option<f32> {
        let mut units: u32 = 0;
        for ch in text.chars() {
            units += u32::from(self.advance(font, ch)?);
        }
        Some(units as f32 * size / 1000.0)
    }
}

/// Base-14 faces used for width estimation and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    TimesRoman,
    TimesBold,
    Courier,
    CourierBold,
}

impl StandardFont {
    pub const ALL: [StandardFont; 6] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::TimesRoman,
        StandardFont::TimesBold,
        StandardFont::Courier,
        StandardFont::CourierBold,
    ];

    /// Maps an arbitrary font name (as found in a source document) to a base-14 face.
    ///
    /// A subset prefix such as `ABCDEF+` is dropped. Oblique and italic variants map
    /// to the upright face, which has the same widths.
    pub fn normalize(font_name: &str) -> Self {
        let name = match font_name.split_once('+') {
            Some((prefix, rest)) if prefix.len() == 6 => rest,
            _ => font_name,
        }
        .to_ascii_lowercase();

        let bold = ["bold", "black", "heavy", "semibold", "demi"]
            .iter()
            .any(|k| name.contains(k));

        if name.contains("courier") || name.contains("mono") {
            if bold {
                StandardFont::CourierBold
            } else {
                StandardFont::Courier
            }
        } else if name.contains("times")
            || (name.contains("serif") && !name.contains("sans"))
            || name.contains("georgia")
            || name.contains("garamond")
        {
            if bold {
                StandardFont::TimesBold
            } else {
                StandardFont::TimesRoman
            }
        } else if bold {
            StandardFont::HelveticaBold
        } else {
            StandardFont::Helvetica
        }
    }

    /// PostScript name of the face.
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
        }
    }

    /// Advance width of `ch`, covering printable ASCII and Latin-1 letters.
    pub fn advance(self, ch: char) -> Option<u16> {
        let ch = fold_latin1(ch);
        if !(' '..='~').contains(&ch) {
            return None;
        }
        if matches!(self, StandardFont::Courier | StandardFont::CourierBold) {
            return Some(600);
        }
        let table = match self {
            StandardFont::Helvetica => &HELVETICA,
            StandardFont::HelveticaBold => &HELVETICA_BOLD,
            StandardFont::TimesRoman => &TIMES_ROMAN,
            _ => &TIMES_BOLD,
        };
        Some(table[ch as usize - 32])
    }
}

/// Metrics of the base-14 faces, selected through [`StandardFont::normalize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFonts;

impl FontMetrics for StandardFonts {
    fn advance(&self, font: &str, ch: char) -> Option<u16> {
        StandardFont::normalize(font).advance(ch)
    }
}

// accented Latin-1 letters share the advance of their base letter
fn fold_latin1(ch: char) -> char {
    match ch {
        'À'..='Å' => 'A',
        'Ç' => 'C',
        'È'..='Ë' => 'E',
        'Ì'..='Ï' => 'I',
        'Ñ' => 'N',
        'Ò'..='Ö' | 'Ø' => 'O',
        'Ù'..='Ü' => 'U',
        'Ý' => 'Y',
        'à'..='å' => 'a',
        'ç' => 'c',
        'è'..='ë' => 'e',
        'ì'..='ï' => 'i',
        'ñ' => 'n',
        'ò'..='ö' | 'ø' => 'o',
        'ù'..='ü' => 'u',
        'ý' | 'ÿ' => 'y',
        '¿' => '?',
        '¡' => '!',
        '\u{a0}' => ' ',
        other => other,
    }
}

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];
