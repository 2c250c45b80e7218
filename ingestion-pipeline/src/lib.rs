#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod artifacts;
pub mod backfill;
pub mod book;
pub mod dedup;
pub mod pipeline;
pub mod types;
pub mod utils;

pub use backfill::{BackfillSummary, VideoBackfill, BACKFILL_WORKERS};
pub use book::{
    BookIngestionOutcome, BookIngestionPipeline, BookIngestionSummary, ResolvedUpload,
    UploadSource,
};
pub use dedup::{DuplicateResolver, DuplicateStrategy};
pub use pipeline::{IngestionConfig, IngestionTuning, VideoIngestError, VideoIngestionPipeline};
