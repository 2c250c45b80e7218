pub mod db;
pub mod indexes;
pub mod keys;
pub mod store;
pub mod title_index;
pub mod types;
