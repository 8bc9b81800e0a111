//! 分片处理流程 - 流程层
//!
//! 核心职责：定义"一个分片"的完整处理流程
//!
//! 流程顺序：
//! 1. 拼接提示词
//! 2. 申请限流名额
//! 3. 调用生成 API（客户端内部重试）
//! 4. 成功则落盘单分片结果
//!
//! 任何一步失败都只影响本分片，结果以 `failed = true` 的 [`ShardOutcome`] 返回

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::clients::{GenerationClient, Transport};
use crate::config::Config;
use crate::error::RateLimitError;
use crate::infrastructure::{CancelToken, RateLimiter};
use crate::models::{ChapterRangeShard, GenerationRequest, GenerationResult, ShardOutcome, ShardRecord};
use crate::services::{build_prompt, ShardStore};
use crate::utils::logging::truncate_text;
use crate::workflow::shard_ctx::{ShardCtx, ShardState};
use std::time::Duration;

/// 分片处理流程
///
/// - 不持有分片集合，只处理单个分片
/// - 依赖注入的限流器和客户端，可被多个任务共享
pub struct ShardFlow<T> {
    client: GenerationClient<T>,
    limiter: Arc<RateLimiter>,
    store: ShardStore,
    cancel: CancelToken,
    template: String,
    novel_title: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl<T: Transport> ShardFlow<T> {
    pub fn new(
        config: &Config,
        client: GenerationClient<T>,
        limiter: Arc<RateLimiter>,
        store: ShardStore,
        cancel: CancelToken,
        template: impl Into<String>,
    ) -> Self {
        Self {
            client,
            limiter,
            store,
            cancel,
            template: template.into(),
            novel_title: config.novel_title.clone(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        }
    }

    /// 处理单个分片
    pub async fn process(&self, shard: ChapterRangeShard, total: usize) -> ShardOutcome {
        let ctx = ShardCtx::new(shard.id, total);
        debug!("{} 状态: {:?}", ctx, ShardState::Pending);

        if self.cancel.is_cancelled() {
            warn!("{} ⏹️ 已取消，跳过", ctx);
            return self.finish(&ctx, ShardOutcome::failed(shard.id, "任务已取消"));
        }

        info!("{} 🚀 开始处理，文本长度: {} 字符", ctx, shard.text.chars().count());
        debug!("{} 状态: {:?}", ctx, ShardState::Running);

        let prompt = build_prompt(&self.template, &self.novel_title, &shard);

        match self.limiter.acquire_or_cancel(&self.cancel).await {
            Ok(()) => {}
            Err(RateLimitError::Cancelled) => {
                warn!("{} ⏹️ 等待请求名额时已取消", ctx);
                return self.finish(&ctx, ShardOutcome::failed(shard.id, "任务已取消"));
            }
            Err(e) => {
                error!("{} ❌ 无法获取请求名额: {}", ctx, e);
                return self.finish(&ctx, ShardOutcome::failed(shard.id, e.to_string()));
            }
        }

        let request = GenerationRequest::new(prompt, self.max_retries, self.retry_delay);
        match self.client.call(&request).await {
            GenerationResult::Success { content, .. } => {
                debug!("{} 响应预览: {}", ctx, truncate_text(&content, 80));
                let record = ShardRecord::new(shard.id, content);
                // 结果已拿到，落盘失败只记录日志，不丢弃分析内容
                if let Err(e) = self.store.save_record(&record).await {
                    error!("{} ⚠️ 保存分析结果失败: {}", ctx, e);
                }
                self.finish(&ctx, ShardOutcome::completed(shard.id, record.analysis))
            }
            GenerationResult::Failure { status_code, error } => {
                error!(
                    "{} ❌ 分析失败 (状态码: {:?}): {}",
                    ctx,
                    status_code,
                    truncate_text(&error, 200)
                );
                self.finish(&ctx, ShardOutcome::failed(shard.id, error))
            }
        }
    }

    fn finish(&self, ctx: &ShardCtx, outcome: ShardOutcome) -> ShardOutcome {
        let state = if outcome.failed {
            ShardState::Failed
        } else {
            info!("{} ✅ 处理完成", ctx);
            ShardState::Completed
        };
        debug!("{} 状态: {:?}", ctx, state);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::TransportResponse;
    use crate::error::ApiError;
    use crate::models::ShardId;
    use async_trait::async_trait;

    struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn send(&self, prompt: &str) -> Result<TransportResponse, ApiError> {
            Ok(TransportResponse {
                status: 200,
                body: format!("len={}", prompt.chars().count()),
            })
        }
    }

    fn flow(dir: &std::path::Path, limiter: Arc<RateLimiter>) -> ShardFlow<EchoTransport> {
        let config = Config::default();
        let cancel = CancelToken::new();
        let client = GenerationClient::new(EchoTransport, Duration::from_secs(5), cancel.clone());
        let store = ShardStore::new(dir.join("split"), dir.join("results"));
        ShardFlow::new(&config, client, limiter, store, cancel, "模板")
    }

    #[tokio::test]
    async fn test_success_persists_record() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("results")).unwrap();
        let limiter = Arc::new(RateLimiter::new(10, Duration::from_secs(60)));
        let flow = flow(dir.path(), limiter);
        let id = ShardId::new(1, 1, 10);

        let outcome = flow
            .process(ChapterRangeShard::new(id, "第1章\n".to_string()), 1)
            .await;

        assert!(!outcome.failed);
        assert!(outcome.analysis.starts_with("len="));
        let saved = flow.store.load_record(id).await.unwrap();
        assert_eq!(saved.analysis, outcome.analysis);
    }

    #[tokio::test]
    async fn test_shutdown_limiter_fails_shard() {
        let dir = tempfile::tempdir().unwrap();
        let limiter = Arc::new(RateLimiter::new(10, Duration::from_secs(60)));
        limiter.shutdown();
        let flow = flow(dir.path(), limiter);

        let outcome = flow
            .process(ChapterRangeShard::new(ShardId::new(2, 11, 20), String::new()), 2)
            .await;

        assert!(outcome.failed);
        assert_eq!(outcome.analysis, RateLimitError::Shutdown.to_string());
    }
}
