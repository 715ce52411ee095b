//! Geometry interchange format.
//!
//! ```xml
//! <document>
//!   <page index="0" width="595" height="842">
//!     <line top="100">
//!       <word x0="50" x1="110" top="100" bottom="112" width="60" height="12"
//!             font="Helvetica" size="12">Cliente:</word>
//!     </line>
//!   </page>
//! </document>
//! ```
//!
//! `x1`/`bottom` may be omitted when `width`/`height` are given and vice versa.
//! Words placed directly under `page` are grouped into lines on read.

use docanon_core::grouping::group_lines;
use docanon_core::{Layout, Line, Page, Word};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("XML syntax error: {0}")]
    Syntax(String),
    #[error("<{element}> is missing attribute `{name}`")]
    MissingAttribute { element: &'static str, name: &'static str },
    #[error("attribute `{name}` is not a number: {value:?}")]
    InvalidNumber { name: String, value: String },
    #[error("unexpected <{0}>")]
    Unexpected(String),
    #[error("XML write error: {0}")]
    Write(String),
}

type Attributes = HashMap<String, String>;

fn attributes(e: &BytesStart<'_>) -> Result<Attributes, XmlError> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| XmlError::Syntax(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| XmlError::Syntax(err.to_string()))?
            .into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

fn number(attrs: &Attributes, name: &str) -> Result<Option<f32>, XmlError> {
    match attrs.get(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f32>()
            .map(Some)
            .map_err(|_| XmlError::InvalidNumber {
                name: name.to_string(),
                value: raw.clone(),
            }),
    }
}

fn required(
    attrs: &Attributes,
    element: &'static str,
    name: &'static str,
) -> Result<f32, XmlError> {
    number(attrs, name)?.ok_or(XmlError::MissingAttribute { element, name })
}

/// One extent (`x0`/`x1`/`width` or `top`/`bottom`/`height`) with one side optional.
fn extent(
    attrs: &Attributes,
    start: &'static str,
    end: &'static str,
    size: &'static str,
) -> Result<(f32, f32, f32), XmlError> {
    let from = required(attrs, "word", start)?;
    match (number(attrs, end)?, number(attrs, size)?) {
        (Some(to), Some(len)) => Ok((from, to, len)),
        (Some(to), None) => Ok((from, to, to - from)),
        (None, Some(len)) => Ok((from, from + len, len)),
        (None, None) => Err(XmlError::MissingAttribute {
            element: "word",
            name: size,
        }),
    }
}

fn word_from(attrs: &Attributes, text: String) -> Result<Word, XmlError> {
    let (x0, x1, width) = extent(attrs, "x0", "x1", "width")?;
    let (top, bottom, height) = extent(attrs, "top", "bottom", "height")?;
    let font_size = number(attrs, "size")?.unwrap_or(height);
    let font_name = attrs
        .get("font")
        .cloned()
        .unwrap_or_else(|| "Helvetica".to_string());
    Ok(Word {
        x0,
        x1,
        top,
        bottom,
        width,
        height,
        font_name,
        font_size,
        text,
    })
}

/// Page being read, with words that sat outside any `line`.
struct PendingPage {
    page: Page,
    loose: Vec<Word>,
}

impl PendingPage {
    fn finish(mut self) -> Page {
        if !self.loose.is_empty() {
            self.page.lines.extend(group_lines(self.loose));
            self.page.lines.sort_by(|a, b| a.top.total_cmp(&b.top));
        }
        self.page
    }
}

/// Parses an interchange document.
pub fn read_layout(xml: &str) -> Result<Layout, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut layout = Layout::default();
    let mut page: Option<PendingPage> = None;
    let mut line: Option<Line> = None;
    // attributes and text of the open <word>
    let mut word: Option<(Attributes, String)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlError::Syntax(format!("at {}: {}", reader.buffer_position(), e)))?;
        match event {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"document" => {}
            Event::Start(e) if e.name().as_ref() == b"page" => {
                let attrs = attributes(&e)?;
                let index = number(&attrs, "index")?
                    .map(|i| i as usize)
                    .unwrap_or(layout.pages.len());
                page = Some(PendingPage {
                    page: Page {
                        index,
                        width: required(&attrs, "page", "width")?,
                        height: required(&attrs, "page", "height")?,
                        lines: Vec::new(),
                    },
                    loose: Vec::new(),
                });
            }
            Event::Empty(e) if e.name().as_ref() == b"page" => {
                let attrs = attributes(&e)?;
                layout.pages.push(Page {
                    index: number(&attrs, "index")?
                        .map(|i| i as usize)
                        .unwrap_or(layout.pages.len()),
                    width: required(&attrs, "page", "width")?,
                    height: required(&attrs, "page", "height")?,
                    lines: Vec::new(),
                });
            }
            Event::Start(e) if e.name().as_ref() == b"line" => {
                let attrs = attributes(&e)?;
                line = Some(Line {
                    top: required(&attrs, "line", "top")?,
                    words: Vec::new(),
                });
            }
            Event::Start(e) if e.name().as_ref() == b"word" => {
                word = Some((attributes(&e)?, String::new()));
            }
            Event::Empty(e) if e.name().as_ref() == b"word" => {
                let parsed = word_from(&attributes(&e)?, String::new())?;
                place(parsed, &mut line, &mut page)?;
            }
            Event::Text(t) => {
                if let Some((_, text)) = word.as_mut() {
                    let unescaped = t.unescape().map_err(|e| XmlError::Syntax(e.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(t) => {
                if let Some((_, text)) = word.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"word" => {
                    if let Some((attrs, text)) = word.take() {
                        let parsed = word_from(&attrs, text)?;
                        place(parsed, &mut line, &mut page)?;
                    }
                }
                b"line" => {
                    if let (Some(mut finished), Some(open)) = (line.take(), page.as_mut()) {
                        finished.words.sort_by(|a, b| a.x0.total_cmp(&b.x0));
                        open.page.lines.push(finished);
                    }
                }
                b"page" => {
                    if let Some(open) = page.take() {
                        layout.pages.push(open.finish());
                    }
                }
                _ => {}
            },
            Event::Start(e) | Event::Empty(e) => {
                return Err(XmlError::Unexpected(
                    String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                ));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(layout)
}

fn place(
    word: Word,
    line: &mut Option<Line>,
    page: &mut Option<PendingPage>,
) -> Result<(), XmlError> {
    match (line.as_mut(), page.as_mut()) {
        (Some(line), _) => line.words.push(word),
        (None, Some(page)) => page.loose.push(word),
        (None, None) => return Err(XmlError::Unexpected("word".to_string())),
    }
    Ok(())
}

fn write_err(e: impl std::fmt::Display) -> XmlError {
    XmlError::Write(e.to_string())
}

/// Serializes `layout` into the interchange format.
pub fn write_layout(layout: &Layout) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("document")))
        .map_err(write_err)?;

    for page in &layout.pages {
        let mut start = BytesStart::new("page");
        start.push_attribute(("index", page.index.to_string().as_str()));
        start.push_attribute(("width", page.width.to_string().as_str()));
        start.push_attribute(("height", page.height.to_string().as_str()));
        writer.write_event(Event::Start(start)).map_err(write_err)?;

        for line in &page.lines {
            let mut start = BytesStart::new("line");
            start.push_attribute(("top", line.top.to_string().as_str()));
            writer.write_event(Event::Start(start)).map_err(write_err)?;

            for word in &line.words {
                let mut start = BytesStart::new("word");
                for (name, value) in [
                    ("x0", word.x0),
                    ("x1", word.x1),
                    ("top", word.top),
                    ("bottom", word.bottom),
                    ("width", word.width),
                    ("height", word.height),
                ] {
                    start.push_attribute((name, value.to_string().as_str()));
                }
                start.push_attribute(("font", word.font_name.as_str()));
                start.push_attribute(("size", word.font_size.to_string().as_str()));

                // an indented empty element would read back as whitespace text
                if word.text.is_empty() {
                    writer.write_event(Event::Empty(start)).map_err(write_err)?;
                } else {
                    writer.write_event(Event::Start(start)).map_err(write_err)?;
                    writer
                        .write_event(Event::Text(BytesText::new(&word.text)))
                        .map_err(write_err)?;
                    writer
                        .write_event(Event::End(BytesEnd::new("word")))
                        .map_err(write_err)?;
                }
            }
            writer
                .write_event(Event::End(BytesEnd::new("line")))
                .map_err(write_err)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("page")))
            .map_err(write_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("document")))
        .map_err(write_err)?;
    String::from_utf8(writer.into_inner()).map_err(write_err)
}
