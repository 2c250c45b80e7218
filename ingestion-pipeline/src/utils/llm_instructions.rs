use serde_json::json;

pub const PRIMARY_CATEGORIES: &[&str] = &["Educational", "Instructional"];

pub const SECONDARY_CATEGORIES: &[&str] = &[
    "MentalHealth",
    "PhysicalHealth",
    "EmotionalHealth",
    "SpiritualGrowth",
    "SocialHealth",
];

pub const ACTIVITY_TYPES: &[&str] = &[
    "Yoga",
    "Meditation",
    "Breathwork",
    "Stretching",
    "StrengthTraining",
    "Cardio",
    "Walking",
    "Journaling",
    "Visualization",
    "SleepPractice",
    "NutritionGuidance",
    "TalkOrLecture",
];

pub const GOAL_OBJECTIVES: &[&str] = &[
    "StressReduction",
    "AnxietyRelief",
    "BetterSleep",
    "FocusAndClarity",
    "EnergyBoost",
    "FlexibilityAndMobility",
    "StrengthBuilding",
    "WeightManagement",
    "EmotionalResilience",
    "SelfCompassion",
    "HabitBuilding",
    "ConnectionAndBelonging",
];

pub const USER_EXPERIENCE_LEVELS: &[&str] =
    &["BeginnerFriendly", "IntermediateLevel", "AdvancedLevel"];

pub const DURATIONS: &[&str] = &[
    "Under5Minutes",
    "5to10Minutes",
    "10to20Minutes",
    "20to30Minutes",
    "30to45Minutes",
    "45to60Minutes",
    "Over60Minutes",
];

pub const TIMES_OF_DAY: &[&str] = &[
    "MorningRoutine",
    "AfternoonBoost",
    "EveningWindDown",
    "BedtimeRoutine",
];

pub const INTENSITIES: &[&str] = &["LowIntensity", "ModerateIntensity", "HighIntensity"];

fn quoted(values: &[&str]) -> String {
    values
        .iter()
        .map(|value| format!("\"{value}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn response_skeleton(video_id: &str, video_title: &str) -> String {
    let skeleton = json!({
        "videoId": video_id,
        "videoTitle": video_title,
        "metadata": {
            "classification": {
                "primaryCategory": null,
                "secondaryCategory": ["string"],
                "activityType": null,
                "goalObjective": null
            },
            "contextualTags": {
                "userExperience": null,
                "intensity": null,
                "duration": null,
                "timeOfDay": null
            },
            "confidence": {
                "primaryCategory": null,
                "secondaryCategory": null,
                "activityType": null,
                "goalObjective": null
            }
        }
    });
    serde_json::to_string_pretty(&skeleton).unwrap_or_default()
}

/// Single user message sent to the tagging model for one video.
pub fn build_tagging_prompt(video_id: &str, video_title: &str, transcript: &str) -> String {
    format!(
        r#"<role>
You classify wellness videos against a fixed taxonomy. Read the title and transcript and fill every field of the response object.
</role>

<data>
Video ID: {video_id}
Video Title: {video_title}
Transcript: {transcript}
</data>

<definitions>
primaryCategory (exactly one):
- Educational: explains concepts and builds knowledge
- Instructional: guides the viewer step by step through an activity

secondaryCategory (one to three):
- MentalHealth: cognition, anxiety, trauma
- PhysicalHealth: fitness, nutrition, chronic conditions
- EmotionalHealth: self-compassion, emotional regulation
- SpiritualGrowth: mindfulness, meaning
- SocialHealth: relationships, community

activityType (exactly one of): {activity_types}
goalObjective (the most specific of): {goal_objectives}
userExperience: {experience}
duration: {durations}
timeOfDay: {times}
intensity: {intensities}
</definitions>

<instructions>
1. Use cues from the title and transcript, explicit or implied.
2. Only use values listed above.
3. Use null where your confidence is below 0.5.
4. secondaryCategory is always a non-empty array.
5. Confidence values are numbers between 0.0 and 1.0; for secondaryCategory use the lowest confidence of the chosen tags.
6. Reply with valid JSON only, double-quoted, no comments.
</instructions>

<response_format>
{skeleton}
</response_format>"#,
        activity_types = quoted(ACTIVITY_TYPES),
        goal_objectives = quoted(GOAL_OBJECTIVES),
        experience = quoted(USER_EXPERIENCE_LEVELS),
        durations = quoted(DURATIONS),
        times = quoted(TIMES_OF_DAY),
        intensities = quoted(INTENSITIES),
        skeleton = response_skeleton(video_id, video_title),
    )
}
