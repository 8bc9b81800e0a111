use std::time::Duration;

/// 单次提交给生成 API 的请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// 首次失败后最多再试几次，总尝试次数为 `1 + max_retries`
    pub max_retries: u32,
    /// 两次尝试之间的固定间隔
    pub retry_delay: Duration,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            prompt: prompt.into(),
            max_retries,
            retry_delay,
        }
    }
}

/// 一次完整请求（含重试）的最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    Success {
        status_code: u16,
        content: String,
    },
    /// `status_code` 为 `None` 表示没有拿到 HTTP 响应（网络错误、超时或取消）
    Failure {
        status_code: Option<u16>,
        error: String,
    },
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success { .. })
    }
}
