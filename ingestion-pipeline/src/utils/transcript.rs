use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Why a transcript could not be produced.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("no transcript found for {0}")]
    NoTranscript(String),
    #[error("transcripts are disabled for {0}")]
    TranscriptsDisabled(String),
    #[error("video {0} is unavailable")]
    VideoUnavailable(String),
    #[error("transcript request failed: {0}")]
    Request(String),
}

#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    async fn fetch_transcript(
        &self,
        video_id: &str,
        language: &str,
    ) -> Result<String, TranscriptError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptSegment {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranscriptBody {
    Segments { segments: Vec<TranscriptSegment> },
    Text { text: String },
}

impl TranscriptBody {
    fn into_text(self) -> String {
        match self {
            Self::Segments { segments } => segments
                .into_iter()
                .map(|segment| segment.text)
                .collect::<Vec<_>>()
                .join(" "),
            Self::Text { text } => text,
        }
    }
}

/// Talks to a transcript service exposing
/// `GET {base}/transcripts/{video_id}?lang={code}`.
pub struct HttpTranscriptProvider {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl HttpTranscriptProvider {
    pub fn new(client: reqwest::Client, base_url: Option<Url>) -> Self {
        Self { client, base_url }
    }

    fn endpoint(&self, video_id: &str, language: &str) -> Result<Url, TranscriptError> {
        let base = self
            .base_url
            .as_ref()
            .ok_or_else(|| TranscriptError::Request("transcript service is not configured".into()))?;

        let mut url = base
            .join(&format!("transcripts/{video_id}"))
            .map_err(|err| TranscriptError::Request(err.to_string()))?;
        url.query_pairs_mut().append_pair("lang", language);
        Ok(url)
    }
}

#[async_trait]
impl TranscriptProvider for HttpTranscriptProvider {
    async fn fetch_transcript(
        &self,
        video_id: &str,
        language: &str,
    ) -> Result<String, TranscriptError> {
        let url = self.endpoint(video_id, language)?;
        debug!(%url, "Requesting transcript");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| TranscriptError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, video_id));
        }

        let body = response
            .text()
            .await
            .map_err(|err| TranscriptError::Request(err.to_string()))?;
        let text = parse_transcript_body(&body)?;
        info!(%video_id, chars = text.chars().count(), "Fetched transcript");
        Ok(text)
    }
}

fn status_error(status: StatusCode, video_id: &str) -> TranscriptError {
    match status {
        StatusCode::NOT_FOUND => TranscriptError::NoTranscript(video_id.to_string()),
        StatusCode::FORBIDDEN => TranscriptError::TranscriptsDisabled(video_id.to_string()),
        StatusCode::GONE => TranscriptError::VideoUnavailable(video_id.to_string()),
        other => TranscriptError::Request(format!("transcript service returned {other}")),
    }
}

fn parse_transcript_body(body: &str) -> Result<String, TranscriptError> {
    serde_json::from_str::<TranscriptBody>(body)
        .map(TranscriptBody::into_text)
        .map_err(|err| TranscriptError::Request(format!("malformed transcript payload: {err}")))
}
