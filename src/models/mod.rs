pub mod chapter;
pub mod generation;
pub mod shard;

pub use chapter::{Chapter, ChapterList};
pub use generation::{GenerationRequest, GenerationResult};
pub use shard::{ChapterRangeShard, ShardId, ShardOutcome, ShardRecord};
