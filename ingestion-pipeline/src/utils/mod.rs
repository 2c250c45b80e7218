pub mod json_extraction;
pub mod llm_instructions;
pub mod tagging;
pub mod transcript;
pub mod video_title;
