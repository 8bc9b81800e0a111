//! 提示词模板

use crate::error::{AppError, AppResult};
use crate::models::ChapterRangeShard;
use std::path::Path;
use tracing::info;

/// 内置分析提示词，`prompt_file` 不存在时使用
pub const DEFAULT_PROMPT_TEMPLATE: &str = "请逐章阅读并分析下面的小说内容，重点关注：

1. 主角的经历与成长：本段的主要事件、转折点，以及性格、能力、心境上的变化。
2. 世界观与设定：涉及的地理、势力、规则与力量体系。
3. 人物关系：与主角相关的关键人物、他们的互动及对主角的影响。
4. 历史与传说：提到的历史事件、传说，以及它们对当前剧情的影响。
5. 伏笔与线索：值得注意的暗示，并推测其可能的走向。

请尽量具体，用情节细节支撑分析；战斗场景可以概括，重点写结果和影响。";

/// 加载提示词模板
///
/// 文件存在则读取文件内容，否则返回内置模板
pub async fn load_prompt_template(path: &Path) -> AppResult<String> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        info!("📝 未找到提示词文件 {}，使用内置模板", path.display());
        return Ok(DEFAULT_PROMPT_TEMPLATE.to_string());
    }

    let template = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path, e))?;
    info!("📝 已加载提示词文件: {}", path.display());
    Ok(template)
}

/// 拼接完整提示词：模板 + 章节范围说明 + 分片原文
pub fn build_prompt(template: &str, novel_title: &str, shard: &ChapterRangeShard) -> String {
    format!(
        "{}\n\n以下是《{}》第{}章到第{}章的内容：\n\n{}",
        template, novel_title, shard.id.start_chapter, shard.id.end_chapter, shard.text
    )
}
