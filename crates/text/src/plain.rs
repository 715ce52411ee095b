//! 纯文本文档处理器
//!
//! 实现 `Document` trait，支持 .txt 和 .md 文件。每一行作为一个段落，
//! 行尾（`\n` 或 `\r\n`）原样保留。

use docanon_core::{Anonymized, Document, Error, Paragraph, Result, RuleSet};
use std::fs;
use std::path::{Path, PathBuf};

/// 纯文本文档处理器
pub struct TextDocument {
    path: PathBuf,
    content: String,
}

/// Splits a line into its body and its terminator.
fn split_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

impl TextDocument {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lines(&self) -> impl Iterator<Item = (&str, &str)> {
        self.content.split_inclusive('\n').map(split_ending)
    }
}

impl Document for TextDocument {
    fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    fn paragraphs(&self) -> Result<Vec<Paragraph>> {
        Ok(self
            .lines()
            .map(|(body, _)| body)
            .filter(|body| !body.trim().is_empty())
            .enumerate()
            .map(|(index, text)| Paragraph {
                index,
                text: text.to_string(),
            })
            .collect())
    }

    fn anonymize(&self, rules: &RuleSet) -> Result<Anonymized> {
        let mut output = String::with_capacity(self.content.len());
        let mut log = Vec::new();

        for (body, ending) in self.lines() {
            if body.trim().is_empty() {
                output.push_str(body);
            } else {
                let (text, entries) = rules.anonymize(body)?;
                output.push_str(&text);
                log.extend(entries);
            }
            output.push_str(ending);
        }

        log::info!("[Text] {}: {} substitutions", self.path.display(), log.len());
        Ok(Anonymized {
            bytes: output.into_bytes(),
            log,
        })
    }
}
