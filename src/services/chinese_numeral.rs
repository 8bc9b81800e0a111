//! 中文数字转换
//!
//! 只支持"个位数字 + 十/百/千"的组合：
//! - 数字字符 一..九 暂存当前位的值
//! - 十/百/千 乘以暂存值（没有暂存值时按 1 计，"十三" = 13）
//! - 各段相加（"二十三" = 20 + 3）
//!
//! 已知限制：不支持 零/〇 占位、两、万及以上量级，
//! 也不推断省略的末位单位（"三百二" 按 302 计算）。
//! 含不支持字符、连续数字（"二三"）或单位不递减（"十十"、"十百"）
//! 的输入返回 `None`，由调用方作为校验错误处理。

use phf::phf_map;

static DIGITS: phf::Map<char, u32> = phf_map! {
    '一' => 1,
    '二' => 2,
    '三' => 3,
    '四' => 4,
    '五' => 5,
    '六' => 6,
    '七' => 7,
    '八' => 8,
    '九' => 9,
};

static UNITS: phf::Map<char, u32> = phf_map! {
    '十' => 10,
    '百' => 100,
    '千' => 1000,
};

/// 将中文数字转换为整数
pub fn parse_chinese_numeral(text: &str) -> Option<u32> {
    if text.is_empty() {
        return None;
    }
    if text == "十" {
        return Some(10);
    }

    let mut result = 0u32;
    let mut pending = 0u32;
    let mut last_unit: Option<u32> = None;

    for c in text.chars() {
        if let Some(&digit) = DIGITS.get(&c) {
            if pending != 0 {
                return None;
            }
            pending = digit;
        } else if let Some(&unit) = UNITS.get(&c) {
            if last_unit.is_some_and(|prev| unit >= prev) {
                return None;
            }
            let base = if pending == 0 { 1 } else { pending };
            result = result.checked_add(base * unit)?;
            pending = 0;
            last_unit = Some(unit);
        } else {
            return None;
        }
    }

    result.checked_add(pending)
}

/// 解析章节编号：先按阿拉伯数字，失败再按中文数字
///
/// 编号 0 视为无法解析
pub fn parse_chapter_number(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    let number = match raw.parse::<u32>() {
        Ok(n) => Some(n),
        Err(_) => parse_chinese_numeral(raw),
    }?;
    (number > 0).then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_numerals() {
        assert_eq!(parse_chinese_numeral("一"), Some(1));
        assert_eq!(parse_chinese_numeral("九"), Some(9));
        assert_eq!(parse_chinese_numeral("十"), Some(10));
        assert_eq!(parse_chinese_numeral("十三"), Some(13));
        assert_eq!(parse_chinese_numeral("二十三"), Some(23));
        assert_eq!(parse_chinese_numeral("三十"), Some(30));
        assert_eq!(parse_chinese_numeral("一百"), Some(100));
    }

    #[test]
    fn test_compound_numerals() {
        assert_eq!(parse_chinese_numeral("一百二十五"), Some(125));
        assert_eq!(parse_chinese_numeral("一千二百三十四"), Some(1234));
        assert_eq!(parse_chinese_numeral("九百九十九"), Some(999));
    }

    #[test]
    fn test_unsupported_characters_are_rejected() {
        assert_eq!(parse_chinese_numeral("一百零五"), None);
        assert_eq!(parse_chinese_numeral("一〇五"), None);
        assert_eq!(parse_chinese_numeral("两百"), None);
        assert_eq!(parse_chinese_numeral("一万"), None);
        assert_eq!(parse_chinese_numeral(""), None);
    }

    #[test]
    fn test_ambiguous_sequences_are_rejected() {
        assert_eq!(parse_chinese_numeral("二三"), None);
        assert_eq!(parse_chinese_numeral("十十"), None);
        assert_eq!(parse_chinese_numeral("十百"), None);
        assert_eq!(parse_chinese_numeral("一百一百"), None);
        assert_eq!(parse_chinese_numeral("二十三四"), None);
    }

    #[test]
    fn test_parse_chapter_number() {
        assert_eq!(parse_chapter_number("12"), Some(12));
        assert_eq!(parse_chapter_number(" 7 "), Some(7));
        assert_eq!(parse_chapter_number("二十"), Some(20));
        assert_eq!(parse_chapter_number("0"), None);
        assert_eq!(parse_chapter_number("零"), None);
    }
}
