/// 章节
///
/// 由章节索引器在扫描时创建，之后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// 章节编号（唯一标识）
    pub number: u32,
    /// 标题行原文
    pub title: String,
    /// 标题所在行号（从1开始）
    pub source_line: usize,
}

impl Chapter {
    pub fn new(number: u32, title: impl Into<String>, source_line: usize) -> Self {
        Self {
            number,
            title: title.into(),
            source_line,
        }
    }

    /// 标题行在行数组中的下标
    pub fn line_index(&self) -> usize {
        self.source_line.saturating_sub(1)
    }
}

/// 通过校验的有序章节列表
///
/// 只能由 [`ChapterIndexer`](crate::services::ChapterIndexer) 构造，
/// 所以持有它就意味着编号从 1 开始连续、无重复，且与原文顺序一致。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterList {
    chapters: Vec<Chapter>,
}

impl ChapterList {
    pub(crate) fn new(chapters: Vec<Chapter>) -> Self {
        Self { chapters }
    }

    pub fn as_slice(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chapter> {
        self.chapters.iter()
    }
}

impl<'a> IntoIterator for &'a ChapterList {
    type Item = &'a Chapter;
    type IntoIter = std::slice::Iter<'a, Chapter>;

    fn into_iter(self) -> Self::IntoIter {
        self.chapters.iter()
    }
}
