//! PDF 重建
//!
//! 按几何树重新生成 PDF：每个几何页一页，每个单词在 `(x0, baseline)` 处用
//! base-14 Type1 字体写出。不嵌入字体，也不复制原文档的其它内容。

use docanon_core::fit::baseline;
use docanon_core::{Layout, Page, RenderError, Renderer, StandardFont};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// Renders a fitted layout with the base-14 text faces.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl Renderer for PdfRenderer {
    fn render(&self, layout: &Layout) -> Result<Vec<u8>, RenderError> {
        render_layout(layout)
    }
}

/// Resource name of a face inside the shared font dictionary.
fn resource_name(font: StandardFont) -> String {
    let index = StandardFont::ALL
        .iter()
        .position(|f| *f == font)
        .unwrap_or_default();
    format!("F{}", index + 1)
}

/// WinAnsi bytes for `text`; characters outside Latin-1 become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn backend(err: lopdf::Error) -> RenderError {
    RenderError::Backend(err.to_string())
}

pub fn render_layout(layout: &Layout) -> Result<Vec<u8>, RenderError> {
    if layout.pages.is_empty() {
        return Err(RenderError::EmptyLayout);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = lopdf::Dictionary::new();
    for font in StandardFont::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(resource_name(font), font_id);
    }
    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
    });

    let mut kids: Vec<Object> = Vec::with_capacity(layout.pages.len());
    for page in &layout.pages {
        let page_id = add_page(&mut doc, page, pages_id, resources_id)?;
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|e| backend(lopdf::Error::from(e)))?;
    log::info!(
        "[Render] {} pages, {} bytes",
        layout.pages.len(),
        bytes.len()
    );
    Ok(bytes)
}

fn add_page(
    doc: &mut Document,
    page: &Page,
    pages_id: ObjectId,
    resources_id: ObjectId,
) -> Result<ObjectId, RenderError> {
    let mut operations = Vec::new();
    for word in page.lines.iter().flat_map(|l| l.words.iter()) {
        if word.text.is_empty() {
            continue;
        }
        let font = StandardFont::normalize(&word.font_name);
        let y = baseline(word, page.height);
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(resource_name(font).into_bytes()),
                word.font_size.into(),
            ],
        ));
        operations.push(Operation::new(
            "Tm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                word.x0.into(),
                y.into(),
            ],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(encode_win_ansi(&word.text))],
        ));
        operations.push(Operation::new("ET", vec![]));
    }

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().map_err(backend)?,
    ));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), page.width.into(), page.height.into()],
        "Contents" => content_id,
        "Resources" => resources_id,
    }))
}
