use crate::{
    storage::types::{ContentKind, TitledRecord},
    stored_object,
    utils::normalize::normalize_title,
};

/// Tags produced by the classification step, flattened to text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoClassification {
    pub primary_category: String,
    pub secondary_category: String,
    pub activity_type: String,
    pub goal_objective: String,
    pub duration: Option<String>,
    pub user_experience: Option<String>,
    pub intensity: Option<String>,
}

stored_object!(Video, "video", {
    youtube_title: String,
    youtube_title_normalized: String,
    link: String,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    ai_duration: Option<String>,
    #[serde(rename = "primaryCategory")]
    primary_category: String,
    #[serde(rename = "secondaryCategory")]
    secondary_category: String,
    #[serde(rename = "activityType")]
    activity_type: String,
    #[serde(rename = "goalObjective")]
    goal_objective: String,
    #[serde(rename = "userExperience", default)]
    user_experience: Option<String>,
    #[serde(default)]
    intensity: Option<String>,
    searchable_text: String,
    embedding: Vec<f32>
});

impl Video {
    pub fn new(
        video_id: &str,
        youtube_title: String,
        classification: VideoClassification,
        searchable_text: String,
        embedding: Vec<f32>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: video_id.to_string(),
            created_at: now,
            updated_at: now,
            youtube_title_normalized: normalize_title(&youtube_title),
            youtube_title,
            link: Self::watch_link(video_id),
            ai_duration: classification.duration.clone(),
            duration: classification.duration,
            primary_category: classification.primary_category,
            secondary_category: classification.secondary_category,
            activity_type: classification.activity_type,
            goal_objective: classification.goal_objective,
            user_experience: classification.user_experience,
            intensity: classification.intensity,
            searchable_text,
            embedding,
        }
    }

    pub fn watch_link(video_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={video_id}")
    }

    /// Pretty JSON copy for the local archive, without the store-managed
    /// id and timestamps.
    pub fn archive_json(&self) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(object) = value.as_object_mut() {
            for managed in ["id", "created_at", "updated_at"] {
                object.remove(managed);
            }
        }
        serde_json::to_string_pretty(&value)
    }
}

impl TitledRecord for Video {
    const KIND: ContentKind = ContentKind::Video;

    fn title(&self) -> &str {
        &self.youtube_title
    }
}
