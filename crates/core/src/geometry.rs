//! 页面几何模型
//!
//! 提取器产出、核心流程原地修改、渲染器消费的文档树：
//! `Layout → Page → Line → Word`。坐标以页面左上角为原点，`top` 向下增长。

use crate::grouping::group_lines;
use serde::{Deserialize, Serialize};

/// 单词框
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
    pub bottom: f32,
    /// 声明宽度（提取器给出，可能与 `x1 - x0` 不同）
    pub width: f32,
    pub height: f32,
    pub font_name: String,
    pub font_size: f32,
    pub text: String,
}

impl Word {
    /// Builds a word box from its left/top corner and size.
    pub fn new(
        x0: f32,
        top: f32,
        width: f32,
        height: f32,
        font_name: impl Into<String>,
        font_size: f32,
        text: impl Into<String>,
    ) -> Self {
        Self {
            x0,
            x1: x0 + width,
            top,
            bottom: top + height,
            width,
            height,
            font_name: font_name.into(),
            font_size,
            text: text.into(),
        }
    }
}

/// 视觉行，单词按 `x0` 从左到右排列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// 行锚点（首个单词四舍五入后的 top）
    pub top: f32,
    pub words: Vec<Word>,
}

impl Line {
    /// Text of the line: non-empty word texts joined by single spaces.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 页码，从 0 开始
    pub index: usize,
    pub width: f32,
    pub height: f32,
    pub lines: Vec<Line>,
}

impl Page {
    pub fn word_count(&self) -> usize {
        self.lines.iter().map(|l| l.words.len()).sum()
    }
}

/// Extractor output: one page of unordered words.
#[derive(Debug, Clone, PartialEq)]
pub struct PageWords {
    pub index: usize,
    pub width: f32,
    pub height: f32,
    pub words: Vec<Word>,
}

/// 整个文档的几何树，每个文档独占一份
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub pages: Vec<Page>,
}

impl Layout {
    /// Runs the line grouper over every extracted page.
    pub fn from_pages(pages: Vec<PageWords>) -> Self {
        let pages = pages
            .into_iter()
            .map(|p| Page {
                index: p.index,
                width: p.width,
                height: p.height,
                lines: group_lines(p.words),
            })
            .collect();
        Self { pages }
    }

    /// Flattens the tree back into per-page word lists.
    pub fn into_page_words(self) -> Vec<PageWords> {
        self.pages
            .into_iter()
            .map(|p| PageWords {
                index: p.index,
                width: p.width,
                height: p.height,
                words: p.lines.into_iter().flat_map(|l| l.words).collect(),
            })
            .collect()
    }

    pub fn word_count(&self) -> usize {
        self.pages.iter().map(Page::word_count).sum()
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.pages.iter().flat_map(|p| p.lines.iter())
    }
}
