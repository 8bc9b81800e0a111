//! 结果合并服务 - 业务能力层
//!
//! 按分片序号排序并生成最终报告，失败的分片也会保留在报告里

use crate::error::{AppError, AppResult};
use crate::models::ShardOutcome;
use std::path::Path;
use tracing::info;

/// 结果合并器
pub struct ResultAggregator {
    novel_title: String,
}

impl ResultAggregator {
    pub fn new(novel_title: impl Into<String>) -> Self {
        Self {
            novel_title: novel_title.into(),
        }
    }

    /// 合并所有分片结果
    ///
    /// 不论完成顺序如何，按分片序号升序输出；每个分片一节
    pub fn merge(&self, mut outcomes: Vec<ShardOutcome>) -> String {
        outcomes.sort_by_key(|o| o.id.index);

        let mut report = format!("# 《{}》小说分析\n\n", self.novel_title);
        for outcome in &outcomes {
            if outcome.failed {
                report.push_str(&format!(
                    "## 第{}章 - 第{}章分析（失败）\n\n> ❌ 分析失败: {}\n\n",
                    outcome.id.start_chapter, outcome.id.end_chapter, outcome.analysis
                ));
            } else {
                report.push_str(&format!(
                    "## 第{}章 - 第{}章分析\n\n{}\n\n",
                    outcome.id.start_chapter, outcome.id.end_chapter, outcome.analysis
                ));
            }
            report.push_str("---\n\n");
        }
        report
    }

    /// 合并并写入最终报告文件
    pub async fn write_report(&self, path: &Path, outcomes: Vec<ShardOutcome>) -> AppResult<String> {
        info!("📑 开始合并API调用结果...");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::create_dir_failed(parent, e))?;
        }

        let report = self.merge(outcomes);
        tokio::fs::write(path, &report)
            .await
            .map_err(|e| AppError::file_write_failed(path, e))?;

        info!("✓ 结果合并完成，已保存到: {}", path.display());
        Ok(report)
    }
}
