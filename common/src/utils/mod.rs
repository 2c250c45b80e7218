pub mod config;
pub mod embedding;
pub mod fuzzy;
pub mod normalize;
pub mod video_id;
