use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 分片标识
///
/// 文件名只由 `(index, start_chapter, end_chapter)` 决定，
/// 后续流程可以不重新读原文、仅凭文件名还原分片身份。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardId {
    /// 分片序号（从1开始）
    pub index: usize,
    pub start_chapter: u32,
    pub end_chapter: u32,
}

impl ShardId {
    pub fn new(index: usize, start_chapter: u32, end_chapter: u32) -> Self {
        Self {
            index,
            start_chapter,
            end_chapter,
        }
    }

    /// 分片文本文件名，例如 `003第21-30章.txt`
    pub fn file_name(&self) -> String {
        format!(
            "{:03}第{}-{}章.txt",
            self.index, self.start_chapter, self.end_chapter
        )
    }

    /// 分析结果文件名，例如 `003第21-30章_分析.json`
    pub fn analysis_file_name(&self) -> String {
        format!(
            "{:03}第{}-{}章_分析.json",
            self.index, self.start_chapter, self.end_chapter
        )
    }

    /// 从分片文本文件名解析标识，格式不符时返回 `None`
    ///
    /// 三段数字都必须是纯 ASCII 数字（不接受符号或空白）
    pub fn parse_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix("章.txt")?;
        let (index, range) = stem.split_once('第')?;
        let (start, end) = range.split_once('-')?;

        Some(Self {
            index: parse_digits(index)?,
            start_chapter: parse_digits(start)?,
            end_chapter: parse_digits(end)?,
        })
    }
}

fn parse_digits<T: std::str::FromStr>(text: &str) -> Option<T> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

impl Display for ShardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "第{}-{}章", self.start_chapter, self.end_chapter)
    }
}

/// 按章节范围切出的分片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRangeShard {
    pub id: ShardId,
    /// 从首章标题行到下一分片首章之前（或文件末尾）的原文
    pub text: String,
}

impl ChapterRangeShard {
    pub fn new(id: ShardId, text: String) -> Self {
        Self { id, text }
    }
}

/// 单个分片的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardOutcome {
    pub id: ShardId,
    /// 成功时为 API 返回内容，失败时为错误信息
    pub analysis: String,
    pub failed: bool,
}

impl ShardOutcome {
    pub fn completed(id: ShardId, analysis: impl Into<String>) -> Self {
        Self {
            id,
            analysis: analysis.into(),
            failed: false,
        }
    }

    pub fn failed(id: ShardId, error: impl Into<String>) -> Self {
        Self {
            id,
            analysis: error.into(),
            failed: true,
        }
    }
}

/// 单分片结果落盘格式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRecord {
    pub file_index: usize,
    pub start_chapter: u32,
    pub end_chapter: u32,
    pub analysis: String,
}

impl ShardRecord {
    pub fn new(id: ShardId, analysis: impl Into<String>) -> Self {
        Self {
            file_index: id.index,
            start_chapter: id.start_chapter,
            end_chapter: id.end_chapter,
            analysis: analysis.into(),
        }
    }

    pub fn shard_id(&self) -> ShardId {
        ShardId::new(self.file_index, self.start_chapter, self.end_chapter)
    }
}
