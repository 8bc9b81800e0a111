pub mod shard_ctx;
pub mod shard_flow;

pub use shard_ctx::{ShardCtx, ShardState};
pub use shard_flow::ShardFlow;
