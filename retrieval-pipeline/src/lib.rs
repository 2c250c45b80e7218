#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod fts;
pub mod search;

pub use search::{SearchDocument, SearchResolver, SearchResults};
