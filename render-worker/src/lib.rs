//! The audio rendering job worker: dequeues meditation-track build requests,
//! orchestrates the render pipeline, and reports progress back to the queue.

pub mod api;
pub mod audio;
pub mod error;
pub mod models;
pub mod pcm;
pub mod pipeline;
pub mod queue;
pub mod runtime;
pub mod tts;
pub mod validators;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use render_common::config::{SupabaseCredentials, TtsCredentials, WorkerTunables};
use render_common::EventBus;

use audio::AudioProcess;
use pipeline::Pipeline;
use queue::{PostgresQueueClient, QueueClient, SupabaseStorage};
use runtime::Environment;

/// Shared state handed to every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub prod: Option<Arc<Environment>>,
    pub dev: Option<Arc<Environment>>,
    pub started_at: DateTime<Utc>,
}

/// Build one environment's [`Environment`] (queue client, audio driver, TTS
/// credentials, event bus) from its Supabase credentials.
pub async fn build_environment(
    name: &str,
    credentials: SupabaseCredentials,
    tts: &TtsCredentials,
    tunables: &WorkerTunables,
    audio: AudioProcess,
) -> render_common::Result<Arc<Environment>> {
    let database_url = credentials.url.clone();
    let pool = render_common::db::init_database(&database_url).await?;
    let storage = SupabaseStorage::new(credentials.url, credentials.service_role_key);
    let queue: Arc<dyn QueueClient> = Arc::new(PostgresQueueClient::new(
        pool,
        tunables.lease_ttl,
        tunables.max_attempts,
        storage,
    ));

    let pipeline = Pipeline {
        queue,
        audio,
        events: EventBus::new(256),
        environment: name.to_string(),
        openai_key: tts.openai_api_key.clone(),
        elevenlabs_key: tts.elevenlabs_api_key.clone(),
    };

    Ok(Arc::new(Environment::new(name, pipeline, tunables.max_jobs_per_cycle)))
}
