//! # Novel Reader
//!
//! 按章节切分长篇小说，并发调用生成 API 逐段分析，最后合并为一份报告
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有共享的稀缺资源，只暴露能力
//! - `RateLimiter` - 固定窗口请求配额
//! - `CancelToken` - 协作式取消信号
//!
//! ### ② 业务能力层（Services / Clients）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `ChapterIndexer` - 识别并校验章节编号
//! - `TextSplitter` - 按章节分组切分原文
//! - `ShardStore` - 读写分片文件和单分片结果
//! - `ResultAggregator` - 合并最终报告
//! - `clients/GenerationClient` - 带超时和重试的生成 API 调用
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个分片"的完整处理流程
//! - `ShardCtx` - 上下文封装（分片序号 + 章节范围）
//! - `ShardFlow` - 流程编排（prompt → 限流 → 调用 → 落盘）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 整条流水线，管理资源
//! - `orchestrator/shard_runner` - 并发处理所有分片
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{GenerationClient, HttpTransport, Transport, TransportResponse};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{CancelToken, RateLimiter};
pub use models::{ChapterRangeShard, ShardId, ShardOutcome};
pub use orchestrator::{App, Orchestrator, RunStats};
pub use workflow::{ShardCtx, ShardFlow};
