//! 分片调度器 - 编排层
//!
//! 把所有分片提交到固定大小的工作池，单个分片失败不影响其他分片

use crate::clients::Transport;
use crate::infrastructure::CancelToken;
use crate::models::{ChapterRangeShard, ShardOutcome};
use crate::workflow::ShardFlow;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// 分片调度器
pub struct Orchestrator<T> {
    flow: Arc<ShardFlow<T>>,
    worker_count: usize,
    cancel: CancelToken,
}

impl<T: Transport + 'static> Orchestrator<T> {
    pub fn new(flow: ShardFlow<T>, worker_count: usize, cancel: CancelToken) -> Self {
        Self {
            flow: Arc::new(flow),
            worker_count: worker_count.max(1),
            cancel,
        }
    }

    /// 处理全部分片
    ///
    /// 每个分片恰好产生一个结果，返回顺序为完成顺序（不排序）。
    /// 取消后排队中的分片不再启动，直接记为失败。
    pub async fn run(&self, shards: Vec<ChapterRangeShard>) -> Vec<ShardOutcome> {
        let total = shards.len();
        let semaphore = Arc::new(Semaphore::new(self.worker_count));
        let mut outcomes = Vec::with_capacity(total);
        let mut tasks = FuturesUnordered::new();

        for shard in shards {
            let id = shard.id;
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                warn!("[分片 {}/{} {}] ⏹️ 已取消，不再启动", id.index, total, id);
                outcomes.push(ShardOutcome::failed(id, "任务已取消"));
                continue;
            };

            let flow = Arc::clone(&self.flow);
            let handle = tokio::spawn(async move {
                let _permit = permit;
                flow.process(shard, total).await
            });
            tasks.push(async move { (id, handle.await) });
        }

        while let Some((id, joined)) = tasks.next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!("[分片 {}/{} {}] 任务执行失败: {}", id.index, total, id, e);
                    outcomes.push(ShardOutcome::failed(id, format!("任务执行失败: {}", e)));
                }
            }
        }

        let failed = outcomes.iter().filter(|o| o.failed).count();
        info!(
            "✓ 所有分片处理结束: 成功 {}/{}",
            outcomes.len() - failed,
            outcomes.len()
        );
        outcomes
    }
}
