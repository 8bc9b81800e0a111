//! 协作式取消令牌

use std::sync::Arc;
use tokio::sync::watch;

/// 取消令牌
///
/// 克隆后共享同一状态；取消是单向的，一旦取消不可恢复。
/// 正在进行的请求会完成当前这一次尝试，之后不再发起新的尝试或新的分片。
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// 等待直到被取消
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // 发送端由 self 持有，wait_for 不会因通道关闭而提前返回
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
