//! 内容流单词提取
//!
//! 逐页解码内容流，跟踪 CTM、文本矩阵、字体和字号，把 `Tj`/`TJ`/`'`/`"`
//! 显示的单字节字符串按空格切成单词框。宽度用与适配阶段相同的字体度量估算。

use crate::utils::{get_media_box, get_number, get_page_content, page_fonts};
use docanon_core::metrics::{FontMetrics, StandardFonts};
use docanon_core::{ExtractionError, Extractor, PageWords, Word};
use lopdf::content::Content;
use lopdf::{Document, Object};
use std::collections::BTreeMap;
use std::path::Path;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// A `TJ` adjustment more negative than this (thousandths of an em) reads as a space.
const TJ_SPACE_THRESHOLD: f32 = -200.0;

/// Advance assumed for characters the metric service does not know.
const DEFAULT_ADVANCE: f32 = 500.0;

/// `m × n` for PDF row-vector matrices.
fn concat(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn matrix_operand(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = IDENTITY;
    for (slot, obj) in m.iter_mut().zip(operands) {
        *slot = get_number(obj)?;
    }
    Some(m)
}

/// Single-byte strings are read as Latin-1.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Direct strategy: words read from the page content streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentStreamExtractor;

impl Extractor for ContentStreamExtractor {
    fn extract(&self, input: &Path) -> Result<Vec<PageWords>, ExtractionError> {
        let doc = Document::load(input).map_err(|e| ExtractionError::Unreadable {
            path: input.to_path_buf(),
            reason: e.to_string(),
        })?;
        let pages = extract_document(&doc)?;

        let words: usize = pages.iter().map(|p| p.words.len()).sum();
        if words == 0 {
            return Err(ExtractionError::NoText(input.to_path_buf()));
        }
        log::info!(
            "[Extract] {}: {} pages, {} words",
            input.display(),
            pages.len(),
            words
        );
        Ok(pages)
    }
}

/// Extracts every page of an already loaded document.
pub fn extract_document(doc: &Document) -> Result<Vec<PageWords>, ExtractionError> {
    let mut pages = Vec::new();
    for (number, page_id) in doc.get_pages() {
        let (llx, lly, urx, ury) = get_media_box(doc, page_id);
        let mut page = PageWords {
            index: number.saturating_sub(1) as usize,
            width: urx - llx,
            height: ury - lly,
            words: Vec::new(),
        };

        let data = match get_page_content(doc, page_id) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("[Extract] page {}: {}", number, e);
                pages.push(page);
                continue;
            }
        };
        let content = Content::decode(&data)
            .map_err(|e| ExtractionError::InvalidGeometry(format!("page {number}: {e}")))?;

        let fonts = page_fonts(doc, page_id);
        let mut walker = TextWalker::new(&fonts, &StandardFonts, (llx, ury));
        walker.run(&content);
        page.words = walker.words;
        pages.push(page);
    }
    Ok(pages)
}

/// Word being assembled from consecutive glyphs.
struct PendingWord {
    text: String,
    /// Text-space origin and device transform at the first glyph.
    start: Matrix,
    advance: f32,
}

struct TextWalker<'a> {
    fonts: &'a BTreeMap<Vec<u8>, String>,
    metrics: &'a dyn FontMetrics,
    /// Top-left corner of the visible box in user space.
    origin: (f32, f32),

    ctm: Matrix,
    stack: Vec<Matrix>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    font_name: String,
    font_size: f32,
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,

    pending: Option<PendingWord>,
    words: Vec<Word>,
}

impl<'a> TextWalker<'a> {
    fn new(
        fonts: &'a BTreeMap<Vec<u8>, String>,
        metrics: &'a dyn FontMetrics,
        origin: (f32, f32),
    ) -> Self {
        Self {
            fonts,
            metrics,
            origin,
            ctm: IDENTITY,
            stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            font_name: "Helvetica".to_string(),
            font_size: 12.0,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            pending: None,
            words: Vec::new(),
        }
    }

    fn run(&mut self, content: &Content) {
        for op in &content.operations {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => self.stack.push(self.ctm),
                "Q" => {
                    if let Some(saved) = self.stack.pop() {
                        self.ctm = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_operand(operands) {
                        self.ctm = concat(&m, &self.ctm);
                    }
                }
                "BT" => {
                    self.text_matrix = IDENTITY;
                    self.line_matrix = IDENTITY;
                }
                "ET" => self.flush(),
                "Tm" => {
                    if let Some(m) = matrix_operand(operands) {
                        self.flush();
                        self.text_matrix = m;
                        self.line_matrix = m;
                    }
                }
                "Td" => {
                    if let [tx, ty, ..] = operands {
                        if let (Some(tx), Some(ty)) = (get_number(tx), get_number(ty)) {
                            self.move_line(tx, ty);
                        }
                    }
                }
                "TD" => {
                    if let [tx, ty, ..] = operands {
                        if let (Some(tx), Some(ty)) = (get_number(tx), get_number(ty)) {
                            self.leading = -ty;
                            self.move_line(tx, ty);
                        }
                    }
                }
                "T*" => self.next_line(),
                "TL" => {
                    if let Some(tl) = operands.first().and_then(get_number) {
                        self.leading = tl;
                    }
                }
                "Tc" => {
                    if let Some(tc) = operands.first().and_then(get_number) {
                        self.char_spacing = tc;
                    }
                }
                "Tw" => {
                    if let Some(tw) = operands.first().and_then(get_number) {
                        self.word_spacing = tw;
                    }
                }
                "Tf" => {
                    if let [Object::Name(name), size, ..] = operands {
                        self.flush();
                        self.font_name = self
                            .fonts
                            .get(name)
                            .cloned()
                            .unwrap_or_else(|| String::from_utf8_lossy(name).into_owned());
                        if let Some(size) = get_number(size) {
                            self.font_size = size.abs();
                        }
                    }
                }
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show(bytes);
                        self.flush();
                    }
                }
                "'" => {
                    self.next_line();
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show(bytes);
                        self.flush();
                    }
                }
                "\"" => {
                    if let [aw, ac, Object::String(bytes, _), ..] = operands {
                        if let (Some(aw), Some(ac)) = (get_number(aw), get_number(ac)) {
                            self.word_spacing = aw;
                            self.char_spacing = ac;
                        }
                        self.next_line();
                        self.show(bytes);
                        self.flush();
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        for item in items {
                            match item {
                                Object::String(bytes, _) => self.show(bytes),
                                other => {
                                    if let Some(adjust) = get_number(other) {
                                        if adjust < TJ_SPACE_THRESHOLD {
                                            self.flush();
                                        }
                                        self.translate(-adjust / 1000.0 * self.font_size);
                                    }
                                }
                            }
                        }
                        self.flush();
                    }
                }
                _ => {}
            }
        }
        self.flush();
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.flush();
        self.line_matrix = concat(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn translate(&mut self, tx: f32) {
        self.text_matrix = concat(&[1.0, 0.0, 0.0, 1.0, tx, 0.0], &self.text_matrix);
    }

    fn show(&mut self, bytes: &[u8]) {
        for ch in decode_latin1(bytes).chars() {
            let units = self
                .metrics
                .advance(&self.font_name, ch)
                .map(f32::from)
                .unwrap_or(DEFAULT_ADVANCE);
            let glyph = units / 1000.0 * self.font_size;
            let spacing = self.char_spacing + if ch == ' ' { self.word_spacing } else { 0.0 };

            if ch.is_whitespace() {
                self.flush();
            } else {
                let start = concat(&self.text_matrix, &self.ctm);
                let pending = self.pending.get_or_insert_with(|| PendingWord {
                    text: String::new(),
                    start,
                    advance: 0.0,
                });
                pending.text.push(ch);
                pending.advance += glyph + spacing;
            }
            self.translate(glyph + spacing);
        }
    }

    fn flush(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let m = pending.start;
        let x_scale = (m[0] * m[0] + m[1] * m[1]).sqrt();
        let y_scale = (m[2] * m[2] + m[3] * m[3]).sqrt();
        let size = self.font_size * y_scale;
        let width = pending.advance * x_scale;

        let (left, top_edge) = self.origin;
        let x0 = m[4] - left;
        let baseline_from_top = top_edge - m[5];
        let top = baseline_from_top - size * 0.75;

        self.words.push(Word::new(
            x0,
            top,
            width,
            size,
            self.font_name.clone(),
            size,
            pending.text,
        ));
    }
}
