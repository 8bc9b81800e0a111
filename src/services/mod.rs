pub mod chapter_indexer;
pub mod chinese_numeral;
pub mod prompt;
pub mod result_aggregator;
pub mod shard_store;
pub mod text_splitter;

pub use chapter_indexer::{ChapterIndexer, ChapterPattern};
pub use chinese_numeral::{parse_chapter_number, parse_chinese_numeral};
pub use prompt::{build_prompt, load_prompt_template, DEFAULT_PROMPT_TEMPLATE};
pub use result_aggregator::ResultAggregator;
pub use shard_store::{validate_shard_set, ShardStore};
pub use text_splitter::TextSplitter;
