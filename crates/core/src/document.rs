//! 统一文档接口定义
//!
//! 无版面几何的流式文本格式（DOCX、纯文本、Markdown）都实现 `Document` trait，
//! 以段落为粒度执行替换。PDF 走 [`crate::pipeline`]。

use crate::Result;
use docanon_rules::{RuleSet, Substitution};
use serde::Serialize;
use std::path::Path;

/// 段落数据结构
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paragraph {
    /// 段落序号，从 0 开始
    pub index: usize,
    /// 段落的纯文本内容
    pub text: String,
}

/// 脱敏结果：输出文件的二进制数据与替换日志
#[derive(Debug, Clone, Default)]
pub struct Anonymized {
    pub bytes: Vec<u8>,
    pub log: Vec<Substitution>,
}

/// 统一文档接口
pub trait Document: Send + Sync {
    /// 加载文档
    ///
    /// 失败时返回明确的错误（文件不存在、格式损坏等）。
    fn load(path: &Path) -> Result<Self>
    where
        Self: Sized;

    /// 按文档顺序列出所有段落
    fn paragraphs(&self) -> Result<Vec<Paragraph>>;

    /// 执行脱敏
    ///
    /// 每个段落独立经过替换引擎，返回可直接写盘的新文档。
    fn anonymize(&self, rules: &RuleSet) -> Result<Anonymized>;
}
