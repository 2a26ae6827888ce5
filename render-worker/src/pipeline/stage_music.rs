//! Stage 2 — Background music: download is the one layer
//! allowed to fail without failing the job.

use std::path::{Path, PathBuf};

use crate::audio::AudioProcess;
use crate::error::WorkerResult;
use crate::models::RenderPayload;
use crate::queue::QueueClient;

/// Returns `Ok(None)` both when the payload has no background music and
/// when the download failed — the caller logs/emits the warning for the
/// latter case since only it knows the job id.
pub async fn run(
    payload: &RenderPayload,
    queue: &dyn QueueClient,
    audio: &AudioProcess,
    temp_dir: &Path,
) -> WorkerResult<Option<PathBuf>> {
    let Some(music) = &payload.background_music else {
        return Ok(None);
    };

    let downloaded = temp_dir.join("music_source.mp3");
    let ok = queue.download_background_music(&music.url, &downloaded).await?;
    if !ok {
        return Ok(None);
    }

    let prepared = temp_dir.join("music_prepared.mp3");
    audio
        .prepare_background_music(
            &downloaded,
            payload.duration_sec,
            payload.fade.in_ms,
            payload.fade.out_ms,
            temp_dir,
            &prepared,
        )
        .await?;
    Ok(Some(prepared))
}
