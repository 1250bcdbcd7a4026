//! 模型调用相关的错误类型与重试工具

use std::{future::Future, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// 网络层失败（连接、超时等）
    #[error("request failed: {0}")]
    Request(String),
    /// 服务端返回非 2xx 状态码
    #[error("http status {status}: {body}")]
    Http { status: u16, body: String },
    /// 响应体无法解析，或者缺少必要字段
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// 消息无法转换为供应商的请求格式
    #[error("message conversion failed: {0}")]
    Conversion(String),
    #[error("missing api key, set one of: {0}")]
    MissingApiKey(String),
    #[error("{0}")]
    Other(String),
}

impl ModelError {
    /// 网络错误、429 以及 5xx 视为可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Request(_) => true,
            ModelError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// 指数退避重试配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// 首次调用之外的最大重试次数
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryConfig {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// 第 `attempt` 次重试前的等待时间（从 0 开始）
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// 执行 `op`，遇到可重试错误时按指数退避重新执行
pub async fn retry_with_backoff<T, F, Fut>(
    config: &RetryConfig,
    mut op: F,
) -> Result<T, ModelError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ModelError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && attempt < config.max_retries => {
                let delay = config.delay_for(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "模型调用失败，准备重试: {}",
                    error
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
