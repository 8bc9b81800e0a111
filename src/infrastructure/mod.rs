//! 基础设施层：持有共享的稀缺资源（请求配额、取消信号），只暴露能力

pub mod cancel;
pub mod rate_limiter;

pub use cancel::CancelToken;
pub use rate_limiter::RateLimiter;
