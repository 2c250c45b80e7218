use common::{
    storage::types::{
        fields::FieldValue,
        video::{Video, VideoClassification},
    },
    utils::normalize::join_present_parts,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification block of the tagging response. Every field is optional
/// because the model does not always fill them all; tags may come back as a
/// single string or a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "primaryCategory", default, skip_serializing_if = "Option::is_none")]
    pub primary_category: Option<FieldValue>,
    #[serde(rename = "secondaryCategory", default, skip_serializing_if = "Option::is_none")]
    pub secondary_category: Option<FieldValue>,
    #[serde(rename = "activityType", default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<FieldValue>,
    #[serde(rename = "goalObjective", default, skip_serializing_if = "Option::is_none")]
    pub goal_objective: Option<FieldValue>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        all_blank([
            self.primary_category.as_ref(),
            self.secondary_category.as_ref(),
            self.activity_type.as_ref(),
            self.goal_objective.as_ref(),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextualTags {
    #[serde(rename = "userExperience", default, skip_serializing_if = "Option::is_none")]
    pub user_experience: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<FieldValue>,
    #[serde(rename = "timeOfDay", default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<FieldValue>,
}

impl ContextualTags {
    pub fn is_empty(&self) -> bool {
        all_blank([
            self.user_experience.as_ref(),
            self.intensity.as_ref(),
            self.duration.as_ref(),
            self.time_of_day.as_ref(),
        ])
    }
}

/// Tags as returned by the model. Blocks without a single non-blank tag are
/// left out when staged, so an untagged reply stages without `metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggingMetadata {
    #[serde(default, skip_serializing_if = "Classification::is_empty")]
    pub classification: Classification,
    #[serde(rename = "contextualTags", default, skip_serializing_if = "ContextualTags::is_empty")]
    pub contextual_tags: ContextualTags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Value>,
}

impl TaggingMetadata {
    /// True when the model produced no tags at all. A bare confidence block
    /// does not count.
    pub fn is_empty(&self) -> bool {
        self.classification.is_empty() && self.contextual_tags.is_empty()
    }
}

/// The tagged structure staged in `processed_transcripts/<id>.json` between
/// tagging and embedding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggedVideo {
    #[serde(rename = "videoId", default)]
    pub video_id: String,
    #[serde(rename = "videoTitle", default)]
    pub video_title: String,
    #[serde(default, skip_serializing_if = "TaggingMetadata::is_empty")]
    pub metadata: TaggingMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_text: Option<String>,
}

impl TaggedVideo {
    /// Title, classification tags and duration, blanks skipped.
    pub fn searchable_text(&self) -> String {
        let title = FieldValue::Text(self.video_title.clone());
        let classification = &self.metadata.classification;
        join_present_parts([
            Some(&title),
            classification.primary_category.as_ref(),
            classification.secondary_category.as_ref(),
            classification.activity_type.as_ref(),
            classification.goal_objective.as_ref(),
            self.metadata.contextual_tags.duration.as_ref(),
        ])
    }

    pub fn classification(&self) -> VideoClassification {
        let classification = &self.metadata.classification;
        let tags = &self.metadata.contextual_tags;
        VideoClassification {
            primary_category: text_or_empty(classification.primary_category.as_ref()),
            secondary_category: text_or_empty(classification.secondary_category.as_ref()),
            activity_type: text_or_empty(classification.activity_type.as_ref()),
            goal_objective: text_or_empty(classification.goal_objective.as_ref()),
            duration: present_text(tags.duration.as_ref()),
            user_experience: present_text(tags.user_experience.as_ref()),
            intensity: present_text(tags.intensity.as_ref()),
        }
    }

    /// Final record for the store.
    pub fn to_video(&self, searchable_text: String, embedding: Vec<f32>) -> Video {
        Video::new(
            &self.video_id,
            self.video_title.clone(),
            self.classification(),
            searchable_text,
            embedding,
        )
    }
}

/// A staged artifact is complete once it carries a non-empty title and a
/// non-empty metadata object.
pub fn is_complete_artifact(raw: &Value) -> bool {
    let has_title = raw
        .get("videoTitle")
        .and_then(Value::as_str)
        .is_some_and(|title| !title.trim().is_empty());
    let has_metadata = raw
        .get("metadata")
        .and_then(Value::as_object)
        .is_some_and(|metadata| !metadata.is_empty());
    has_title && has_metadata
}

fn all_blank<'a>(values: impl IntoIterator<Item = Option<&'a FieldValue>>) -> bool {
    values
        .into_iter()
        .all(|value| value.is_none_or(FieldValue::is_blank))
}

fn text_or_empty(value: Option<&FieldValue>) -> String {
    value.map(FieldValue::stringify).unwrap_or_default()
}

fn present_text(value: Option<&FieldValue>) -> Option<String> {
    value
        .filter(|value| !value.is_blank())
        .map(FieldValue::stringify)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> TaggedVideo {
        serde_json::from_value(json!({
            "videoId": "dQw4w9WgXcQ",
            "videoTitle": "Morning Yoga Flow",
            "metadata": {
                "classification": {
                    "primaryCategory": "Instructional",
                    "secondaryCategory": ["PhysicalHealth", "MentalHealth"],
                    "activityType": "Yoga",
                    "goalObjective": ""
                },
                "contextualTags": {
                    "userExperience": "BeginnerFriendly",
                    "intensity": "LowIntensity",
                    "duration": "10to20Minutes",
                    "timeOfDay": "MorningRoutine"
                },
                "confidence": { "overall": 0.9 }
            }
        }))
        .expect("tagged video")
    }

    #[test]
    fn searchable_text_skips_blank_tags() {
        assert_eq!(
            sample().searchable_text(),
            "Morning Yoga Flow Instructional PhysicalHealth, MentalHealth Yoga 10to20Minutes"
        );
    }

    #[test]
    fn builds_video_record_with_flattened_tags() {
        let tagged = sample();
        let video = tagged.to_video(tagged.searchable_text(), vec![0.1, 0.2]);

        assert_eq!(video.id, "dQw4w9WgXcQ");
        assert_eq!(video.secondary_category, "PhysicalHealth, MentalHealth");
        assert_eq!(video.goal_objective, "");
        assert_eq!(video.duration.as_deref(), Some("10to20Minutes"));
        assert_eq!(video.ai_duration.as_deref(), Some("10to20Minutes"));
        assert_eq!(video.user_experience.as_deref(), Some("BeginnerFriendly"));
    }

    #[test]
    fn completeness_requires_title_and_metadata() {
        assert!(is_complete_artifact(&serde_json::to_value(sample()).expect("value")));
        assert!(!is_complete_artifact(&json!({"videoTitle": "x", "metadata": {}})));
        assert!(!is_complete_artifact(&json!({"videoTitle": " ", "metadata": {"a": 1}})));
        assert!(!is_complete_artifact(&json!({"metadata": {"a": 1}})));
    }

    #[test]
    fn untagged_replies_stage_without_metadata() {
        for reply in [
            json!({}),
            json!({"note": "no tags"}),
            json!({"metadata": {}}),
            json!({"metadata": {"classification": {"primaryCategory": " "}, "confidence": 0.4}}),
        ] {
            let mut tagged: TaggedVideo = serde_json::from_value(reply).expect("tagged video");
            tagged.video_title = "Morning Yoga Flow".to_string();
            assert!(tagged.metadata.is_empty());

            let staged = serde_json::to_value(&tagged).expect("value");
            assert!(staged.get("metadata").is_none());
            assert!(!is_complete_artifact(&staged));
        }
    }

    #[test]
    fn partial_tags_keep_only_filled_blocks() {
        let tagged: TaggedVideo = serde_json::from_value(json!({
            "videoTitle": "Box Breathing",
            "metadata": { "contextualTags": { "duration": "Under10Minutes" } }
        }))
        .expect("tagged video");

        let staged = serde_json::to_value(&tagged).expect("value");
        assert_eq!(
            staged["metadata"],
            json!({ "contextualTags": { "duration": "Under10Minutes" } })
        );
        assert!(is_complete_artifact(&staged));
    }
}
