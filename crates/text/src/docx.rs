//! DOCX 文档处理器
//!
//! 只改写正文、页眉和页脚部件中的 `w:t` 文本，其它 zip 条目原样复制。
//! 段落文本是其自身 `w:t` 的拼接；替换后整段新文本写入第一个 `w:t`，
//! 其余清空，从而保留第一个 run 的格式。

use docanon_core::{Anonymized, Document, Error, Paragraph, Result, RuleSet, Substitution};
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MAIN_PART: &str = "word/document.xml";

/// 需要改写的部件：正文、页眉、页脚
fn is_text_part(name: &str) -> bool {
    if name == MAIN_PART {
        return true;
    }
    let Some(file) = name.strip_prefix("word/") else {
        return false;
    };
    let Some(stem) = file.strip_suffix(".xml") else {
        return false;
    };
    ["header", "footer"].iter().any(|kind| {
        stem.strip_prefix(kind)
            .is_some_and(|n| n.chars().all(|c| c.is_ascii_digit()))
    })
}

fn malformed(context: &str, err: impl std::fmt::Display) -> Error {
    Error::Malformed(format!("{context}: {err}"))
}

/// One `w:t` element: event indices of its start tag and its text.
struct TextSlot {
    start: usize,
    text_event: Option<usize>,
    text: String,
}

#[derive(Default)]
struct OpenParagraph {
    slots: Vec<TextSlot>,
}

impl OpenParagraph {
    fn text(&self) -> String {
        self.slots.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Paragraph of a parsed part, with its `w:t` slots in document order.
struct PartParagraph {
    slots: Vec<TextSlot>,
    text: String,
}

/// XML events of one part plus the paragraphs found in it.
struct Part {
    events: Vec<Event<'static>>,
    paragraphs: Vec<PartParagraph>,
}

impl Part {
    fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut events = Vec::new();
        let mut stack: Vec<OpenParagraph> = Vec::new();
        let mut paragraphs = Vec::new();
        let mut in_text = false;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| malformed("invalid XML", e))?
                .into_owned();
            let index = events.len();
            match &event {
                Event::Start(e) if e.name().as_ref() == b"w:p" => stack.push(OpenParagraph::default()),
                Event::End(e) if e.name().as_ref() == b"w:p" => {
                    if let Some(open) = stack.pop() {
                        let text = open.text();
                        paragraphs.push(PartParagraph {
                            slots: open.slots,
                            text,
                        });
                    }
                }
                Event::Start(e) if e.name().as_ref() == b"w:t" => {
                    if let Some(open) = stack.last_mut() {
                        open.slots.push(TextSlot {
                            start: index,
                            text_event: None,
                            text: String::new(),
                        });
                        in_text = true;
                    }
                }
                Event::End(e) if e.name().as_ref() == b"w:t" => in_text = false,
                Event::Text(t) if in_text => {
                    let unescaped = t.unescape().map_err(|e| malformed("invalid text", e))?;
                    if let Some(slot) = stack.last_mut().and_then(|p| p.slots.last_mut()) {
                        slot.text_event.get_or_insert(index);
                        slot.text.push_str(&unescaped);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            events.push(event);
        }

        Ok(Self { events, paragraphs })
    }

    /// Runs every non-empty paragraph through the rules, rewriting changed ones.
    fn anonymize(&mut self, rules: &RuleSet, log: &mut Vec<Substitution>) -> Result<()> {
        for paragraph in &self.paragraphs {
            if paragraph.text.is_empty() {
                continue;
            }
            let (text, entries) = rules.anonymize(&paragraph.text)?;
            log.extend(entries);
            if text == paragraph.text {
                continue;
            }

            let mut slots = paragraph.slots.iter().filter(|s| s.text_event.is_some());
            if let Some(first) = slots.next() {
                replace_text(&mut self.events, first, &text);
                if let Event::Start(start) = &mut self.events[first.start] {
                    let preserved = start
                        .attributes()
                        .flatten()
                        .any(|a| a.key.as_ref() == b"xml:space");
                    if !preserved {
                        start.push_attribute(("xml:space", "preserve"));
                    }
                }
            }
            for rest in slots {
                replace_text(&mut self.events, rest, "");
            }
        }
        Ok(())
    }

    fn write(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.events {
            writer
                .write_event(event)
                .map_err(|e| malformed("cannot write XML", e))?;
        }
        Ok(writer.into_inner())
    }
}

fn replace_text(events: &mut [Event<'static>], slot: &TextSlot, text: &str) {
    if let Some(index) = slot.text_event {
        events[index] = Event::Text(BytesText::new(text).into_owned());
    }
}

/// DOCX 文档处理器
pub struct DocxDocument {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl DocxDocument {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn archive(&self) -> Result<ZipArchive<Cursor<&[u8]>>> {
        ZipArchive::new(Cursor::new(self.bytes.as_slice()))
            .map_err(|e| malformed(&self.path.display().to_string(), e))
    }

    /// Parsed text parts, body first, then headers and footers by name.
    fn parts(&self) -> Result<Vec<(String, Part)>> {
        let mut archive = self.archive()?;
        let mut names: Vec<String> = archive
            .file_names()
            .filter(|n| is_text_part(n))
            .map(str::to_string)
            .collect();
        names.sort_by_key(|n| (n.as_str() != MAIN_PART, n.clone()));

        let mut parts = Vec::with_capacity(names.len());
        for name in names {
            let mut xml = String::new();
            archive
                .by_name(&name)
                .map_err(|e| malformed(&name, e))?
                .read_to_string(&mut xml)
                .map_err(|e| malformed(&name, e))?;
            let part = Part::parse(&xml).map_err(|e| malformed(&name, e))?;
            parts.push((name, part));
        }
        Ok(parts)
    }
}

impl Document for DocxDocument {
    fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let doc = Self {
            path: path.to_path_buf(),
            bytes,
        };
        if doc.archive()?.index_for_name(MAIN_PART).is_none() {
            return Err(Error::Malformed(format!(
                "{}: missing {}",
                path.display(),
                MAIN_PART
            )));
        }
        Ok(doc)
    }

    fn paragraphs(&self) -> Result<Vec<Paragraph>> {
        let texts = self
            .parts()?
            .into_iter()
            .flat_map(|(_, part)| part.paragraphs.into_iter().map(|p| p.text))
            .filter(|t| !t.is_empty());
        Ok(texts
            .enumerate()
            .map(|(index, text)| Paragraph { index, text })
            .collect())
    }

    fn anonymize(&self, rules: &RuleSet) -> Result<Anonymized> {
        let mut log = Vec::new();
        let mut rewritten = Vec::new();
        for (name, mut part) in self.parts()? {
            part.anonymize(rules, &mut log)?;
            rewritten.push((name, part.write()?));
        }

        let mut archive = self.archive()?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for i in 0..archive.len() {
            let file = archive.by_index(i).map_err(|e| malformed("zip entry", e))?;
            let name = file.name().to_string();
            match rewritten.iter().find(|(n, _)| *n == name) {
                Some((_, xml)) => {
                    drop(file);
                    writer
                        .start_file(name.as_str(), options)
                        .map_err(|e| malformed(&name, e))?;
                    writer.write_all(xml).map_err(|e| malformed(&name, e))?;
                }
                None => writer
                    .raw_copy_file(file)
                    .map_err(|e| malformed(&name, e))?,
            }
        }

        let bytes = writer
            .finish()
            .map_err(|e| malformed("zip", e))?
            .into_inner();
        log::info!(
            "[Docx] {}: {} substitutions",
            self.path.display(),
            log.len()
        );
        Ok(Anonymized { bytes, log })
    }
}
