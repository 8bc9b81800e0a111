//! 小说分析流水线 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责完整流水线的调度和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：加载 API 密钥，创建 HTTP 通道
//! 2. **章节处理**：读取原文、提取标题、校验编号、按组分片并落盘
//! 3. **并发分析**：创建限流器，交给 [`Orchestrator`] 并发处理所有分片
//! 4. **结果合并**：按分片序号生成最终报告
//! 5. **资源管理**：持有限流器，流程结束后显式关闭
//!
//! ## 设计特点
//!
//! - **失败前置**：校验或分片失败时不会发起任何网络请求
//! - **资源所有者**：唯一创建 RateLimiter 的模块
//! - **向下委托**：单个分片的细节交给 workflow::ShardFlow

use crate::clients::{GenerationClient, HttpTransport, Transport};
use crate::config::{load_api_key, Config};
use crate::error::{AppError, FileError};
use crate::infrastructure::{CancelToken, RateLimiter};
use crate::models::{ChapterRangeShard, ShardOutcome};
use crate::orchestrator::shard_runner::Orchestrator;
use crate::services::{
    load_prompt_template, ChapterIndexer, ResultAggregator, ShardStore, TextSplitter,
};
use crate::utils::logging::{log_shards_ready, log_startup, print_final_stats};
use crate::workflow::ShardFlow;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// 章节标题清单文件名（位于 `output_dir` 下）
pub const CHAPTER_TITLES_FILE: &str = "章节名称.txt";

/// 应用主结构
pub struct App<T> {
    config: Config,
    transport: T,
    cancel: CancelToken,
}

impl App<HttpTransport> {
    /// 初始化应用：加载密钥并连接真实 API
    pub fn initialize(config: Config) -> Result<Self> {
        let api_key = load_api_key(&config)?;
        let transport = HttpTransport::new(&config, api_key).map_err(AppError::from)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport + 'static> App<T> {
    /// 使用指定通道创建应用
    pub fn with_transport(config: Config, transport: T) -> Self {
        Self {
            config,
            transport,
            cancel: CancelToken::new(),
        }
    }

    /// 外部取消入口
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// 运行完整流水线
    pub async fn run(self) -> Result<RunStats> {
        log_startup(&self.config);

        let shards = if self.config.reuse_split_files {
            self.load_existing_shards().await?
        } else {
            self.prepare_shards().await?
        };

        if shards.is_empty() {
            warn!("⚠️ 没有可处理的分片，程序结束");
            return Ok(RunStats::default());
        }

        if self.cancel.is_cancelled() {
            warn!("⏹️ 任务在开始分析前已取消");
            return Err(AppError::Cancelled.into());
        }

        let App {
            config,
            transport,
            cancel,
        } = self;
        let outcomes = Self::analyze(&config, transport, &cancel, shards).await?;

        let stats = RunStats::from_outcomes(&outcomes);
        ResultAggregator::new(&config.novel_title)
            .write_report(&config.final_report_file, outcomes)
            .await?;

        if cancel.is_cancelled() {
            warn!("⏹️ 任务被取消，报告中包含未完成的分片");
        }
        print_final_stats(stats.success, stats.failed, &config.final_report_file);

        Ok(stats)
    }

    /// 读取原文 → 校验 → 写标题清单 → 分片 → 写分片文件
    async fn prepare_shards(&self) -> Result<Vec<ChapterRangeShard>> {
        let config = &self.config;
        info!("\n📁 正在读取小说文件: {}", config.novel_file.display());

        if !tokio::fs::try_exists(&config.novel_file).await.unwrap_or(false) {
            return Err(AppError::from(FileError::NotFound {
                path: config.novel_file.clone(),
            })
            .into());
        }
        let content = tokio::fs::read_to_string(&config.novel_file)
            .await
            .map_err(|e| AppError::file_read_failed(&config.novel_file, e))?;
        let lines: Vec<&str> = content.lines().collect();

        let indexer = ChapterIndexer::from_config(config).map_err(AppError::from)?;
        // 校验通过之前不产生任何输出文件
        let chapters = indexer.index(&lines).map_err(AppError::from)?;
        self.write_chapter_titles(&indexer.extract_titles(&lines))
            .await?;

        let shards = TextSplitter::new(config.chapters_per_shard)
            .map_err(AppError::from)?
            .split(&chapters, &lines);

        let store = self.store();
        store.prepare().await?;
        store.write_split_shards(&shards).await?;

        Ok(shards)
    }

    /// 直接从分片目录恢复分片，跳过索引和分割
    async fn load_existing_shards(&self) -> Result<Vec<ChapterRangeShard>> {
        info!(
            "\n📁 复用已有分片文件: {}",
            self.config.split_chapters_dir.display()
        );
        let store = self.store();
        let shards = store.load_split_shards().await?;
        store.prepare().await?;
        Ok(shards)
    }

    async fn write_chapter_titles(&self, titles: &[(usize, String)]) -> Result<()> {
        let dir = &self.config.output_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::create_dir_failed(dir, e))?;

        let path = dir.join(CHAPTER_TITLES_FILE);
        let mut content = String::new();
        for (_, title) in titles {
            content.push_str(title);
            content.push('\n');
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| AppError::file_write_failed(&path, e))?;

        info!("✓ 已提取 {} 个章节标题到 {}", titles.len(), path.display());
        Ok(())
    }

    /// 并发分析所有分片
    async fn analyze(
        config: &Config,
        transport: T,
        cancel: &CancelToken,
        shards: Vec<ChapterRangeShard>,
    ) -> Result<Vec<ShardOutcome>> {
        let template = load_prompt_template(&config.prompt_file).await?;

        let limiter = Arc::new(RateLimiter::from_config(config));
        let client = GenerationClient::new(transport, config.request_timeout, cancel.clone());
        let flow = ShardFlow::new(
            config,
            client,
            Arc::clone(&limiter),
            ShardStore::new(&config.split_chapters_dir, &config.api_results_dir),
            cancel.clone(),
            template,
        );
        let orchestrator = Orchestrator::new(flow, config.worker_count, cancel.clone());

        log_shards_ready(shards.len(), config.worker_count);
        let outcomes = orchestrator.run(shards).await;

        limiter.shutdown();
        Ok(outcomes)
    }

    fn store(&self) -> ShardStore {
        ShardStore::new(
            &self.config.split_chapters_dir,
            &self.config.api_results_dir,
        )
    }
}

/// 处理统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

impl RunStats {
    pub fn from_outcomes(outcomes: &[ShardOutcome]) -> Self {
        let failed = outcomes.iter().filter(|o| o.failed).count();
        Self {
            total: outcomes.len(),
            success: outcomes.len() - failed,
            failed,
        }
    }
}
