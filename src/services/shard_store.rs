//! 分片文件存储服务 - 业务能力层
//!
//! 只负责"读写分片文件和分析结果"能力，不关心流程

use crate::error::{AppError, AppResult, FileError, ValidationError};
use crate::models::{ChapterRangeShard, ShardId, ShardRecord};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};

/// 分片文件存储
///
/// - `split_dir`：分片原文，`NNN第S-E章.txt`
/// - `results_dir`：单分片分析结果，`NNN第S-E章_分析.json`
#[derive(Debug, Clone)]
pub struct ShardStore {
    split_dir: PathBuf,
    results_dir: PathBuf,
}

impl ShardStore {
    pub fn new(split_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            split_dir: split_dir.into(),
            results_dir: results_dir.into(),
        }
    }

    pub fn split_dir(&self) -> &Path {
        &self.split_dir
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// 创建输出目录，失败即致命
    pub async fn prepare(&self) -> AppResult<()> {
        for dir in [&self.split_dir, &self.results_dir] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| AppError::create_dir_failed(dir, e))?;
        }
        Ok(())
    }

    /// 将分片原文写入 `split_dir`
    ///
    /// 写入前先删除目录中已有的分片文件，避免上次运行（可能分组不同）的残留混入
    pub async fn write_split_shards(&self, shards: &[ChapterRangeShard]) -> AppResult<Vec<PathBuf>> {
        self.clear_split_shards().await?;

        let mut paths = Vec::with_capacity(shards.len());
        for shard in shards {
            let path = self.split_dir.join(shard.id.file_name());
            fs::write(&path, &shard.text)
                .await
                .map_err(|e| AppError::file_write_failed(&path, e))?;
            debug!("已创建分割文件: {}", shard.id.file_name());
            paths.push(path);
        }
        info!("✓ 已写入 {} 个分割文件到 {}", paths.len(), self.split_dir.display());
        Ok(paths)
    }

    /// 删除 `split_dir` 中所有符合分片命名格式的文件，其他文件保留
    async fn clear_split_shards(&self) -> AppResult<()> {
        let mut entries = fs::read_dir(&self.split_dir)
            .await
            .map_err(|e| AppError::file_read_failed(&self.split_dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::file_read_failed(&self.split_dir, e))?
        {
            let name = entry.file_name();
            if name.to_str().and_then(ShardId::parse_file_name).is_none() {
                continue;
            }
            let path = entry.path();
            fs::remove_file(&path)
                .await
                .map_err(|e| AppError::file_write_failed(&path, e))?;
            debug!("已删除旧的分割文件: {}", path.display());
        }
        Ok(())
    }

    /// 从 `split_dir` 重新加载分片，身份只从文件名解析
    ///
    /// 不符合命名格式的文件会被跳过；结果按分片序号升序，
    /// 并且必须通过 [`validate_shard_set`]
    pub async fn load_split_shards(&self) -> AppResult<Vec<ChapterRangeShard>> {
        if !self.split_dir.is_dir() {
            return Err(FileError::NotFound {
                path: self.split_dir.clone(),
            }
            .into());
        }

        let mut entries = fs::read_dir(&self.split_dir)
            .await
            .map_err(|e| AppError::file_read_failed(&self.split_dir, e))?;

        let mut shards = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::file_read_failed(&self.split_dir, e))?
        {
            let path = entry.path();
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(ShardId::parse_file_name) else {
                debug!("跳过非分片文件: {}", path.display());
                continue;
            };

            let text = fs::read_to_string(&path)
                .await
                .map_err(|e| AppError::file_read_failed(&path, e))?;
            shards.push(ChapterRangeShard::new(id, text));
        }

        if shards.is_empty() {
            warn!("⚠️ 在 {} 中没有找到分割后的章节文件", self.split_dir.display());
        }

        shards.sort_by_key(|s| s.id);
        validate_shard_set(&shards)?;
        Ok(shards)
    }

    /// 保存单分片分析结果（格式化 JSON）
    pub async fn save_record(&self, record: &ShardRecord) -> AppResult<PathBuf> {
        let path = self
            .results_dir
            .join(record.shard_id().analysis_file_name());
        let json = serde_json::to_string_pretty(record).map_err(|source| FileError::JsonFailed {
            path: path.clone(),
            source,
        })?;

        fs::write(&path, json)
            .await
            .map_err(|e| AppError::file_write_failed(&path, e))?;
        info!("💾 已保存API结果: {}", record.shard_id().analysis_file_name());
        Ok(path)
    }

    /// 读取单分片分析结果
    pub async fn load_record(&self, id: ShardId) -> AppResult<ShardRecord> {
        let path = self.results_dir.join(id.analysis_file_name());
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::file_read_failed(&path, e))?;
        serde_json::from_str(&content)
            .map_err(|source| FileError::JsonFailed { path, source }.into())
    }
}

/// 校验分片集合
///
/// 序号必须是 `1..=n`，章节范围从第 1 章开始首尾衔接、互不重叠。
/// `shards` 需已按序号排序。
pub fn validate_shard_set(shards: &[ChapterRangeShard]) -> Result<(), ValidationError> {
    let mut expected_start = 1u32;
    for (i, shard) in shards.iter().enumerate() {
        let id = shard.id;
        if id.index != i + 1 {
            error!("❌ 分片序号不连续: 期望 {}，实际 {}", i + 1, id.index);
            return Err(ValidationError::ShardIndex {
                expected: i + 1,
                found: id.index,
            });
        }
        if id.start_chapter != expected_start || id.end_chapter < id.start_chapter {
            error!("❌ 分片 {} 的章节范围无效: {}", id.index, id);
            return Err(ValidationError::ShardRange {
                index: id.index,
                start: id.start_chapter,
                end: id.end_chapter,
                expected_start,
            });
        }
        expected_start = id.end_chapter.saturating_add(1);
    }
    Ok(())
}
