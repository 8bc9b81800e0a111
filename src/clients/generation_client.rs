/// 生成 API 客户端
///
/// 封装请求发送、单次超时和固定间隔重试；失败不会以错误形式抛出，
/// 而是编码为 [`GenerationResult::Failure`]
use crate::config::Config;
use crate::error::ApiError;
use crate::infrastructure::CancelToken;
use crate::models::{GenerationRequest, GenerationResult};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

/// 视为成功的 HTTP 状态码
pub const SUCCESS_STATUS: u16 = 200;

/// 一次原始响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// 发送单次请求的底层通道
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, prompt: &str) -> Result<TransportResponse, ApiError>;
}

/// 基于 reqwest 的 Gemini `generateContent` 通道
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &Config, api_key: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Transport {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.api_base_url.trim_end_matches('/'),
                config.model_name
            ),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, prompt: &str) -> Result<TransportResponse, ApiError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Transport {
                // 去掉 URL，避免密钥出现在日志里
                message: e.without_url().to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| ApiError::Transport {
            message: e.without_url().to_string(),
        })?;

        Ok(TransportResponse { status, body })
    }
}

/// 生成客户端
pub struct GenerationClient<T> {
    transport: T,
    request_timeout: Duration,
    cancel: CancelToken,
}

impl<T: Transport> GenerationClient<T> {
    pub fn new(transport: T, request_timeout: Duration, cancel: CancelToken) -> Self {
        Self {
            transport,
            request_timeout,
            cancel,
        }
    }

    /// 发送请求，失败时按固定间隔重试
    ///
    /// 总尝试次数为 `1 + max_retries`。取消后不再发起新的尝试，
    /// 退避等待期间被取消也会立即返回。
    pub async fn call(&self, request: &GenerationRequest) -> GenerationResult {
        let total_attempts = request.max_retries + 1;
        let mut last_failure: Option<(Option<u16>, String)> = None;

        for attempt in 1..=total_attempts {
            if attempt > 1 {
                warn!(
                    "API调用失败，{:?} 后重试 {}/{}",
                    request.retry_delay,
                    attempt - 1,
                    request.max_retries
                );
                tokio::select! {
                    _ = sleep(request.retry_delay) => {}
                    _ = self.cancel.cancelled() => {}
                }
            }

            if self.cancel.is_cancelled() {
                warn!("任务已取消，停止重试 (已尝试 {} 次)", attempt - 1);
                let error = match &last_failure {
                    Some((_, last)) => format!("任务已取消，最后一次错误: {}", last),
                    None => "任务已取消".to_string(),
                };
                return GenerationResult::Failure {
                    status_code: None,
                    error,
                };
            }

            debug!("正在调用生成 API (第 {}/{} 次)", attempt, total_attempts);
            match self.attempt(&request.prompt).await {
                Ok(response) if response.status == SUCCESS_STATUS => {
                    debug!("API调用成功，响应长度: {} 字节", response.body.len());
                    return GenerationResult::Success {
                        status_code: response.status,
                        content: response.body,
                    };
                }
                Ok(response) => {
                    error!("API调用失败，状态码: {}", response.status);
                    let error = ApiError::BadStatus {
                        status: response.status,
                        body: response.body,
                    };
                    last_failure = Some((Some(response.status), error.to_string()));
                }
                Err(e) => {
                    error!("API调用出错: {}", e);
                    last_failure = Some((None, e.to_string()));
                }
            }
        }

        let (status_code, error) =
            last_failure.unwrap_or_else(|| (None, "请求未发出".to_string()));
        GenerationResult::Failure { status_code, error }
    }

    async fn attempt(&self, prompt: &str) -> Result<TransportResponse, ApiError> {
        match timeout(self.request_timeout, self.transport.send(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout {
                timeout_ms: self.request_timeout.as_millis() as u64,
            }),
        }
    }
}
