use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{error, warn};

use common::storage::types::video::Video;

pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Looks up the human title of a video. Never fails: unknown titles come back
/// as [`UNKNOWN_TITLE`].
#[async_trait]
pub trait TitleProvider: Send + Sync {
    async fn fetch_title(&self, video_id: &str) -> String;
}

/// Reads the `<title>` of the public watch page.
pub struct WatchPageTitleProvider {
    client: reqwest::Client,
}

impl WatchPageTitleProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TitleProvider for WatchPageTitleProvider {
    async fn fetch_title(&self, video_id: &str) -> String {
        let page = match self.client.get(Video::watch_link(video_id)).send().await {
            Ok(response) => response.text().await,
            Err(err) => Err(err),
        };

        match page {
            Ok(html) => extract_page_title(&html).unwrap_or_else(|| {
                warn!(%video_id, "Watch page has no title");
                UNKNOWN_TITLE.to_string()
            }),
            Err(err) => {
                error!(%video_id, error = %err, "Title fetch failed");
                UNKNOWN_TITLE.to_string()
            }
        }
    }
}

fn title_tag() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok())
        .as_ref()
}

/// Text of the first `<title>` element with the site suffix removed.
pub fn extract_page_title(html: &str) -> Option<String> {
    let raw = title_tag()?.captures(html)?.get(1)?.as_str();
    let title = unescape_entities(raw).replace(" - YouTube", "");
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

fn unescape_entities(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_site_suffix_and_entities() {
        let html = "<html><head><title>Morning Yoga &amp; Breath - YouTube</title></head></html>";
        assert_eq!(
            extract_page_title(html).as_deref(),
            Some("Morning Yoga & Breath")
        );
    }

    #[test]
    fn missing_or_empty_title_is_none() {
        assert!(extract_page_title("<html></html>").is_none());
        assert!(extract_page_title("<title> - YouTube</title>").is_none());
    }
}
