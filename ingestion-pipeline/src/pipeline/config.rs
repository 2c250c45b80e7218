use std::time::Duration;

#[derive(Debug, Clone)]
pub struct IngestionTuning {
    /// Ceiling for the staged-artifact confirmation poll.
    pub artifact_poll_timeout: Duration,
    pub artifact_poll_interval: Duration,
}

impl Default for IngestionTuning {
    fn default() -> Self {
        Self {
            artifact_poll_timeout: Duration::from_secs(20),
            artifact_poll_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestionConfig {
    pub tuning: IngestionTuning,
    pub transcript_language: String,
}

impl IngestionConfig {
    pub fn with_language(language: impl Into<String>) -> Self {
        Self {
            tuning: IngestionTuning::default(),
            transcript_language: language.into(),
        }
    }

    pub(crate) fn language(&self) -> &str {
        if self.transcript_language.is_empty() {
            "en"
        } else {
            &self.transcript_language
        }
    }
}
