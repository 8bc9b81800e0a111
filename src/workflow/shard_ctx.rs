//! 分片处理上下文
//!
//! 封装"我正在处理第几个分片、覆盖哪些章节"这一信息

use crate::models::ShardId;
use std::fmt::Display;

/// 分片任务状态
///
/// `Completed` 与 `Failed` 都是终态，编排层不会再次提交同一分片
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// 分片处理上下文
#[derive(Debug, Clone, Copy)]
pub struct ShardCtx {
    pub id: ShardId,
    /// 分片总数（仅用于日志显示）
    pub total: usize,
}

impl ShardCtx {
    pub fn new(id: ShardId, total: usize) -> Self {
        Self { id, total }
    }
}

impl Display for ShardCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[分片 {}/{} {}]", self.id.index, self.total, self.id)
    }
}
