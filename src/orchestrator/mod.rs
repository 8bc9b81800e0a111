//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责整条流水线和并发调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 流水线
//! - 管理应用生命周期（初始化、运行、统计）
//! - 读取原文、校验章节、分片落盘
//! - 创建并关闭限流器（RateLimiter）
//! - 合并最终报告
//!
//! ### `shard_runner` - 分片调度器
//! - 固定大小的工作池（Semaphore）
//! - 每个分片一个任务，失败互不影响
//! - 响应取消信号，排队中的分片不再启动
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理整本小说)
//!     ↓
//! shard_runner (处理 Vec<ChapterRangeShard>)
//!     ↓
//! workflow::ShardFlow (处理单个分片)
//!     ↓
//! services / clients (能力层：分片存储 / 提示词 / 生成 API)
//!     ↓
//! infrastructure (基础设施：RateLimiter / CancelToken)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管流水线，shard_runner 管并发
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度和统计，不做具体业务判断

pub mod batch_processor;
pub mod shard_runner;

// 重新导出主要类型
pub use batch_processor::{App, RunStats, CHAPTER_TITLES_FILE};
pub use shard_runner::Orchestrator;
