//! 章节索引服务 - 业务能力层
//!
//! 只负责"识别章节并校验编号"能力，不关心文件和分片

use crate::config::Config;
use crate::error::{UnparsableTitle, ValidationError};
use crate::models::{Chapter, ChapterList};
use crate::services::chinese_numeral::parse_chapter_number;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

/// 章节标题识别规则
///
/// 规则必须带有名为 `num` 的捕获组，匹配"第"与"章"之间的编号部分。
#[derive(Debug, Clone)]
pub struct ChapterPattern {
    regex: Regex,
}

impl ChapterPattern {
    pub fn new(pattern: &str) -> Result<Self, ValidationError> {
        let regex = Regex::new(pattern).map_err(|e| ValidationError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        if !regex.capture_names().flatten().any(|name| name == "num") {
            return Err(ValidationError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "缺少名为 num 的捕获组".to_string(),
            });
        }

        Ok(Self { regex })
    }

    /// 若该行是章节标题，返回其中的编号文本
    pub fn capture_number<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.regex
            .captures(line)
            .and_then(|caps| caps.name("num"))
            .map(|m| m.as_str())
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}

/// 章节索引器
///
/// 职责：
/// - 逐行识别章节标题并提取编号
/// - 收集重复、缺失、乱序和无法解析的编号
/// - 只有全部通过才交出 [`ChapterList`]
pub struct ChapterIndexer {
    pattern: ChapterPattern,
}

impl ChapterIndexer {
    pub fn new(pattern: ChapterPattern) -> Self {
        Self { pattern }
    }

    pub fn from_config(config: &Config) -> Result<Self, ValidationError> {
        Ok(Self::new(ChapterPattern::new(&config.chapter_pattern)?))
    }

    /// 扫描并校验章节
    ///
    /// # 返回
    /// 按编号升序排列的章节列表；编号不满足 `{1..max}` 各出现一次时返回错误
    pub fn index<S: AsRef<str>>(&self, lines: &[S]) -> Result<ChapterList, ValidationError> {
        info!("📖 开始验证章节...");

        let mut chapters = Vec::new();
        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        let mut unparsable = Vec::new();
        let mut title_count = 0usize;

        for (idx, line) in lines.iter().enumerate() {
            let source_line = idx + 1;
            let title = line.as_ref().trim();
            let Some(raw_number) = self.pattern.capture_number(title) else {
                continue;
            };
            title_count += 1;

            match parse_chapter_number(raw_number) {
                Some(number) if seen.contains(&number) => {
                    warn!("⚠️ 发现重复章节: 第{}章，行号: {}", number, source_line);
                    duplicates.insert(number);
                }
                Some(number) => {
                    debug!("识别章节: 第{}章，行号: {}", number, source_line);
                    seen.insert(number);
                    chapters.push(Chapter::new(number, title, source_line));
                }
                None => {
                    warn!("⚠️ 无法提取章节编号: {}，行号: {}", title, source_line);
                    unparsable.push(UnparsableTitle {
                        source_line,
                        title: title.to_string(),
                    });
                }
            }
        }

        if seen.is_empty() && unparsable.is_empty() {
            error!("❌ 未识别到任何章节标题");
            return Err(ValidationError::NoChapters);
        }

        // 编号超过标题数两倍时，1..=编号 中一半以上都缺失，视为编号写错而不是缺章；
        // 缺失列表只在这个上限内计算，长度不超过标题行数的两倍
        let limit = u32::try_from(title_count.saturating_mul(2)).unwrap_or(u32::MAX);
        let out_of_range: Vec<u32> = seen.iter().copied().filter(|&n| n > limit).collect();
        let max_chapter = seen.range(..=limit).next_back().copied().unwrap_or(0);
        let missing: Vec<u32> = (1..=max_chapter).filter(|n| !seen.contains(n)).collect();

        // 按原文顺序扫描得到的编号必须递增，否则分片会越过其他章节
        let out_of_order: Vec<u32> = chapters
            .windows(2)
            .filter(|pair| pair[1].number < pair[0].number)
            .map(|pair| pair[1].number)
            .collect();

        if !missing.is_empty()
            || !duplicates.is_empty()
            || !out_of_order.is_empty()
            || !out_of_range.is_empty()
            || !unparsable.is_empty()
        {
            return Err(numbering_error(NumberingIssues {
                missing,
                duplicates,
                out_of_order,
                out_of_range,
                unparsable,
            }));
        }

        chapters.sort_by_key(|c| c.number);
        info!("✓ 章节验证通过，共发现 {} 个章节", chapters.len());

        Ok(ChapterList::new(chapters))
    }

    /// 提取所有章节标题行（不做校验）
    ///
    /// # 返回
    /// `(行号, 标题)` 列表，按原文顺序
    pub fn extract_titles<S: AsRef<str>>(&self, lines: &[S]) -> Vec<(usize, String)> {
        lines
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| {
                let title = line.as_ref().trim();
                self.pattern
                    .is_match(title)
                    .then(|| (idx + 1, title.to_string()))
            })
            .collect()
    }
}

struct NumberingIssues {
    missing: Vec<u32>,
    duplicates: BTreeSet<u32>,
    out_of_order: Vec<u32>,
    out_of_range: Vec<u32>,
    unparsable: Vec<UnparsableTitle>,
}

fn numbering_error(issues: NumberingIssues) -> ValidationError {
    let NumberingIssues {
        missing,
        duplicates,
        out_of_order,
        out_of_range,
        unparsable,
    } = issues;

    if !missing.is_empty() {
        error!("❌ 缺失章节列表: {:?}", missing);
    }
    if !duplicates.is_empty() {
        error!("❌ 重复章节列表: {:?}", duplicates);
    }
    if !out_of_order.is_empty() {
        error!("❌ 乱序章节列表: {:?}", out_of_order);
    }
    if !out_of_range.is_empty() {
        error!("❌ 编号超出章节总数: {:?}", out_of_range);
    }
    for title in &unparsable {
        error!("❌ 无法解析的章节标题 (行 {}): {}", title.source_line, title.title);
    }

    ValidationError::Numbering {
        missing,
        duplicates: duplicates.into_iter().collect(),
        out_of_order,
        out_of_range,
        unparsable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CHAPTER_PATTERN;

    fn indexer() -> ChapterIndexer {
        ChapterIndexer::new(ChapterPattern::new(DEFAULT_CHAPTER_PATTERN).unwrap())
    }

    fn novel(numbers: &[&str]) -> Vec<String> {
        let mut lines = vec!["书名：测试".to_string(), String::new()];
        for n in numbers {
            lines.push(format!("第{}章 标题", n));
            lines.push("正文内容".to_string());
        }
        lines
    }

    #[test]
    fn test_contiguous_chapters_pass() {
        let lines = novel(&["1", "2", "三", "四", "5"]);
        let chapters = indexer().index(&lines).unwrap();

        let numbers: Vec<u32> = chapters.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(chapters.as_slice()[0].source_line, 3);
        assert_eq!(chapters.as_slice()[0].title, "第1章 标题");
    }

    #[test]
    fn test_missing_chapter_is_reported() {
        let lines = novel(&["一", "二", "四"]);
        let err = indexer().index(&lines).unwrap_err();

        match err {
            ValidationError::Numbering {
                missing, duplicates, ..
            } => {
                assert_eq!(missing, vec![3]);
                assert!(duplicates.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_chapter_is_reported() {
        let lines = novel(&["1", "2", "2", "3"]);
        let err = indexer().index(&lines).unwrap_err();

        match err {
            ValidationError::Numbering {
                missing, duplicates, ..
            } => {
                assert!(missing.is_empty());
                assert_eq!(duplicates, vec![2]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_out_of_order_chapters_are_rejected() {
        let lines = novel(&["2", "1", "3"]);
        let err = indexer().index(&lines).unwrap_err();

        assert!(matches!(
            err,
            ValidationError::Numbering { ref out_of_order, .. } if out_of_order == &vec![1]
        ));
    }

    #[test]
    fn test_unsupported_numeral_is_validation_error() {
        let lines = novel(&["一", "二", "一百零五"]);
        let err = indexer().index(&lines).unwrap_err();

        match err {
            ValidationError::Numbering { unparsable, .. } => {
                assert_eq!(unparsable.len(), 1);
                assert_eq!(unparsable[0].title, "第一百零五章 标题");
                assert_eq!(unparsable[0].source_line, 7);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_typo_number_is_out_of_range_not_missing() {
        let lines = vec!["第1章 a", "正文", "第50000000章 b", "第4294967295章 c"];
        let err = indexer().index(&lines).unwrap_err();

        match err {
            ValidationError::Numbering {
                missing,
                out_of_range,
                ..
            } => {
                assert!(missing.is_empty());
                assert_eq!(out_of_range, vec![50_000_000, u32::MAX]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_list_is_bounded_by_title_count() {
        // 5 个标题，上限为 10
        let lines = novel(&["1", "2", "5", "6", "100"]);
        let err = indexer().index(&lines).unwrap_err();

        match err {
            ValidationError::Numbering {
                missing,
                out_of_range,
                ..
            } => {
                assert_eq!(missing, vec![3, 4]);
                assert_eq!(out_of_range, vec![100]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_no_chapters() {
        let lines = vec!["只有正文", "没有章节"];
        assert_eq!(indexer().index(&lines), Err(ValidationError::NoChapters));
    }

    #[test]
    fn test_body_mentions_are_not_titles() {
        let lines = vec!["第1章 开始", "他想起第2章里的事情", "第2章 继续"];
        let chapters = indexer().index(&lines).unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters.as_slice()[1].source_line, 3);
    }

    #[test]
    fn test_custom_pattern() {
        let pattern = ChapterPattern::new(r"^Chapter (?P<num>\d+)\b.*$").unwrap();
        let lines = vec!["Chapter 1 Start", "text", "Chapter 2 End"];
        let chapters = ChapterIndexer::new(pattern).index(&lines).unwrap();
        assert_eq!(chapters.len(), 2);
    }

    #[test]
    fn test_pattern_without_num_group_is_rejected() {
        assert!(matches!(
            ChapterPattern::new(r"^第.+章"),
            Err(ValidationError::InvalidPattern { .. })
        ));
        assert!(matches!(
            ChapterPattern::new(r"^第(?P<num>"),
            Err(ValidationError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_extract_titles() {
        let lines = novel(&["1", "一百零五"]);
        let titles = indexer().extract_titles(&lines);
        assert_eq!(
            titles,
            vec![
                (3, "第1章 标题".to_string()),
                (5, "第一百零五章 标题".to_string())
            ]
        );
    }
}
