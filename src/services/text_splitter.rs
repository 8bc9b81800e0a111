//! 文本分片服务 - 业务能力层
//!
//! 把校验过的章节按固定数量分组，切出每组对应的原文

use crate::error::ValidationError;
use crate::models::{ChapterList, ChapterRangeShard, ShardId};
use tracing::{debug, info};

/// 文本分片器
pub struct TextSplitter {
    group_size: usize,
}

impl TextSplitter {
    pub fn new(group_size: usize) -> Result<Self, ValidationError> {
        if group_size == 0 {
            return Err(ValidationError::ZeroGroupSize);
        }
        Ok(Self { group_size })
    }

    /// 按每 `group_size` 章一组切分原文
    ///
    /// 每个分片从本组首章标题行开始，到下一组首章标题行之前结束，
    /// 最后一组到文件末尾。首章之前的内容（书名、简介等）并入第一个分片，
    /// 因此所有分片文本按序拼接即为完整原文（每行以 `\n` 结尾）。
    pub fn split<S: AsRef<str>>(
        &self,
        chapters: &ChapterList,
        lines: &[S],
    ) -> Vec<ChapterRangeShard> {
        info!("✂️ 开始按章节分割小说，每 {} 章一个分片", self.group_size);

        let groups: Vec<_> = chapters.as_slice().chunks(self.group_size).collect();
        let mut shards = Vec::with_capacity(groups.len());

        for (g, group) in groups.iter().enumerate() {
            let (Some(first), Some(last)) = (group.first(), group.last()) else {
                continue;
            };

            let start_line = if g == 0 { 0 } else { first.line_index() };
            let end_line = groups
                .get(g + 1)
                .and_then(|next| next.first())
                .map_or(lines.len(), |next| next.line_index())
                .min(lines.len());
            let start_line = start_line.min(end_line);

            let mut text = String::new();
            for line in &lines[start_line..end_line] {
                text.push_str(line.as_ref());
                text.push('\n');
            }

            let id = ShardId::new(g + 1, first.number, last.number);
            debug!(
                "分片 {}: {} (行 {}-{})",
                id.index,
                id,
                start_line + 1,
                end_line
            );
            shards.push(ChapterRangeShard::new(id, text));
        }

        info!("✓ 小说分割完成，共 {} 个分片", shards.len());
        shards
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CHAPTER_PATTERN;
    use crate::services::chapter_indexer::{ChapterIndexer, ChapterPattern};

    fn novel(chapter_count: u32) -> Vec<String> {
        let mut lines = vec!["《测试》".to_string(), "作者：某人".to_string()];
        for n in 1..=chapter_count {
            lines.push(format!("第{}章 第{}回合", n, n));
            lines.push(String::new());
            lines.push(format!("第{}章的正文。", n));
        }
        lines
    }

    fn index(lines: &[String]) -> ChapterList {
        ChapterIndexer::new(ChapterPattern::new(DEFAULT_CHAPTER_PATTERN).unwrap())
            .index(lines)
            .unwrap()
    }

    #[test]
    fn test_zero_group_size_is_rejected() {
        assert!(matches!(
            TextSplitter::new(0),
            Err(ValidationError::ZeroGroupSize)
        ));
    }

    #[test]
    fn test_split_25_chapters_into_3_shards() {
        let lines = novel(25);
        let chapters = index(&lines);
        let shards = TextSplitter::new(10).unwrap().split(&chapters, &lines);

        let ranges: Vec<(usize, u32, u32)> = shards
            .iter()
            .map(|s| (s.id.index, s.id.start_chapter, s.id.end_chapter))
            .collect();
        assert_eq!(ranges, vec![(1, 1, 10), (2, 11, 20), (3, 21, 25)]);

        assert!(shards[1].text.starts_with("第11章 第11回合\n"));
        assert!(shards[1].text.ends_with("第20章的正文。\n"));
        assert!(shards[2].text.ends_with("第25章的正文。\n"));
    }

    #[test]
    fn test_shards_reconstruct_source() {
        let lines = novel(25);
        let chapters = index(&lines);
        let shards = TextSplitter::new(10).unwrap().split(&chapters, &lines);

        let rebuilt: String = shards.iter().map(|s| s.text.as_str()).collect();
        let original: String = lines.iter().map(|l| format!("{l}\n")).collect();
        assert_eq!(rebuilt, original);
        assert!(shards[0].text.starts_with("《测试》\n"));
    }

    #[test]
    fn test_group_larger_than_chapter_count() {
        let lines = novel(3);
        let chapters = index(&lines);
        let shards = TextSplitter::new(10).unwrap().split(&chapters, &lines);

        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].id, ShardId::new(1, 1, 3));
    }

    #[test]
    fn test_shard_indices_are_dense() {
        let lines = novel(31);
        let chapters = index(&lines);
        let shards = TextSplitter::new(3).unwrap().split(&chapters, &lines);

        let indices: Vec<usize> = shards.iter().map(|s| s.id.index).collect();
        assert_eq!(indices, (1..=11).collect::<Vec<_>>());
        assert_eq!(shards.last().map(|s| s.id), Some(ShardId::new(11, 31, 31)));
    }
}
