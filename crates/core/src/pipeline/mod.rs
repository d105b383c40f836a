//! Daily pipeline orchestration.
//!
//! `FETCH → TAG_PASS → SUMMARY_PASS → MERGE → RETRY_PASS → FINALIZE → PERSIST`
//!
//! Rows are identified by their fetch position throughout; the retry pass
//! runs at most once and replaces rows in place.

mod daily;
mod types;

pub use daily::{finalize, merge_results, select_incomplete, DailyPipeline};
pub use types::{EnrichedRow, PassStats, PipelineError, PipelineReport};
