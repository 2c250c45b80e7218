use bytes::Bytes;
use common::{
    error::AppError,
    storage::types::{video::Video, TitledRecord},
};
use serde_json::Value;
use state_machines::core::GuardError;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use crate::{artifacts, types::tagged_video::is_complete_artifact};

use super::{
    context::PipelineContext,
    error::VideoIngestError,
    state::{Embedded, New, Stored, Tagged, Transcribed, VideoMachine},
};

#[instrument(level = "trace", skip_all, fields(video_id = %ctx.video_id))]
pub async fn transcribe(
    machine: VideoMachine<(), New>,
    ctx: &mut PipelineContext<'_>,
) -> Result<VideoMachine<(), Transcribed>, VideoIngestError> {
    let location = artifacts::transcript(&ctx.video_id);
    let transcript = if ctx.storage.exists(&location).await? {
        let bytes = ctx.storage.get(&location).await?;
        debug!(video_id = %ctx.video_id, "Reusing stored transcript");
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        let language = ctx.pipeline_config.language();
        match ctx.services.fetch_transcript(&ctx.video_id, language).await {
            Ok(text) if !text.trim().is_empty() => {
                ctx.storage
                    .put(&location, Bytes::from(text.clone()))
                    .await?;
                text
            }
            Ok(_) => String::new(),
            Err(err) => {
                warn!(video_id = %ctx.video_id, error = %err, "Transcript unavailable");
                String::new()
            }
        }
    };

    if transcript.trim().is_empty() {
        return Err(VideoIngestError::EmptyTranscript);
    }

    let preview: String = transcript.chars().take(120).collect();
    debug!(
        video_id = %ctx.video_id,
        chars = transcript.chars().count(),
        preview = %preview.replace('\n', " "),
        "Transcript ready"
    );
    ctx.transcript = Some(transcript);

    machine
        .transcribe()
        .map_err(|(_, guard)| map_guard_error("transcribe", &guard))
}

#[instrument(level = "trace", skip_all, fields(video_id = %ctx.video_id))]
pub async fn tag(
    machine: VideoMachine<(), Transcribed>,
    ctx: &mut PipelineContext<'_>,
) -> Result<VideoMachine<(), Tagged>, VideoIngestError> {
    let transcript = ctx.transcript()?.to_string();

    let title = ctx.services.fetch_title(&ctx.video_id).await;
    info!(video_id = %ctx.video_id, title = %title, "Resolved video title");
    ctx.title = Some(title);

    let mut tagged = ctx
        .services
        .classify(&ctx.video_id, ctx.title(), &transcript)
        .await
        .map_err(|err| VideoIngestError::Tagging(err.to_string()))?;

    tagged.video_id.clone_from(&ctx.video_id);
    tagged.video_title = ctx.title().to_string();
    tagged.transcript_text = Some(transcript);

    let location = artifacts::processed_transcript(&ctx.video_id);
    let payload = serde_json::to_vec_pretty(&tagged)?;
    ctx.storage.put(&location, Bytes::from(payload)).await?;
    info!(video_id = %ctx.video_id, %location, "Staged tagged video");

    wait_for_complete_artifact(ctx, &location).await?;
    ctx.tagged = Some(tagged);

    machine
        .tag()
        .map_err(|(_, guard)| map_guard_error("tag", &guard))
}

/// Polls the staged artifact until it reads back complete, bounded by the
/// configured timeout.
async fn wait_for_complete_artifact(
    ctx: &PipelineContext<'_>,
    location: &str,
) -> Result<(), VideoIngestError> {
    let tuning = &ctx.pipeline_config.tuning;
    let deadline = Instant::now()
        .checked_add(tuning.artifact_poll_timeout)
        .unwrap_or_else(Instant::now);

    loop {
        match ctx.storage.get(location).await {
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(raw) if is_complete_artifact(&raw) => return Ok(()),
                Ok(_) => debug!(%location, "Staged artifact incomplete, waiting"),
                Err(err) => debug!(%location, error = %err, "Staged artifact unreadable, waiting"),
            },
            Err(err) => debug!(%location, error = %err, "Staged artifact not visible yet"),
        }

        if Instant::now() >= deadline {
            warn!(%location, "Staged artifact never became valid");
            return Err(VideoIngestError::InvalidArtifact);
        }
        sleep(tuning.artifact_poll_interval).await;
    }
}

#[instrument(level = "trace", skip_all, fields(video_id = %ctx.video_id))]
pub async fn embed(
    machine: VideoMachine<(), Tagged>,
    ctx: &mut PipelineContext<'_>,
) -> Result<VideoMachine<(), Embedded>, VideoIngestError> {
    let searchable_text = ctx.tagged()?.searchable_text();
    let embedding = ctx.services.embed(&searchable_text).await?;

    debug!(
        video_id = %ctx.video_id,
        dimensions = embedding.len(),
        "Video embedding created"
    );

    ctx.searchable_text = Some(searchable_text);
    ctx.embedding = Some(embedding);

    machine
        .embed()
        .map_err(|(_, guard)| map_guard_error("embed", &guard))
}

#[instrument(level = "trace", skip_all, fields(video_id = %ctx.video_id))]
pub async fn store(
    machine: VideoMachine<(), Embedded>,
    ctx: &mut PipelineContext<'_>,
) -> Result<(VideoMachine<(), Stored>, Video), VideoIngestError> {
    let searchable_text = ctx.searchable_text.take().unwrap_or_default();
    let embedding = ctx.embedding.take().ok_or_else(|| {
        VideoIngestError::Store(AppError::InternalError(
            "embedding expected to be available for persistence".into(),
        ))
    })?;
    let video = ctx.tagged()?.to_video(searchable_text, embedding);

    let location = artifacts::formatted_json(&ctx.video_id);
    ctx.storage
        .put(&location, Bytes::from(video.archive_json()?))
        .await?;

    ctx.db.store_item(video.clone()).await?;
    info!(video_id = %ctx.video_id, key = %video.key(), "Stored video");

    let machine = machine
        .store()
        .map_err(|(_, guard)| map_guard_error("store", &guard))?;
    Ok((machine, video))
}

fn map_guard_error(event: &str, guard: &GuardError) -> VideoIngestError {
    VideoIngestError::Store(AppError::InternalError(format!(
        "invalid video pipeline transition during {event}: {guard:?}"
    )))
}
