//! Audio rendering job worker binary: loads dual-environment
//! queue credentials, verifies the audio toolchain, and runs the
//! dispatch loop until shutdown.

use std::sync::Arc;

use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use render_common::config::{SupabaseCredentials, TtsCredentials, WorkerTunables};
use render_worker::audio::AudioProcess;
use render_worker::runtime::Runtime;
use render_worker::{build_environment, AppState};

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to install tracing subscriber");
    }

    match run().await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!(error = %e, "startup failed");
            std::process::exit(1);
        }
    }
}

async fn run() -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), built = env!("BUILD_TIMESTAMP"), "starting render worker");

    let tunables = WorkerTunables::resolve();
    let tts = TtsCredentials::resolve();

    let audio = AudioProcess::default();
    audio.detect_capabilities().await?;
    info!("audio process driver capability check passed");

    // DEV is the baseline queue binding; PROD is optional.
    let dev_credentials = SupabaseCredentials::resolve_dev()
        .ok_or_else(|| anyhow::anyhow!("SUPABASE_DEV_URL/SUPABASE_DEV_SERVICE_ROLE_KEY (or legacy SUPABASE_URL/SUPABASE_SERVICE_ROLE_KEY) are required"))?;
    let dev = build_environment("DEV", dev_credentials, &tts, &tunables, audio.clone()).await?;

    let prod = match SupabaseCredentials::resolve_prod() {
        Some(credentials) => Some(build_environment("PROD", credentials, &tts, &tunables, audio.clone()).await?),
        None => {
            info!("no PROD credentials configured; running DEV only");
            None
        }
    };

    let state = AppState {
        prod: prod.clone(),
        dev: Some(dev.clone()),
        started_at: chrono::Utc::now(),
    };

    let app = render_worker::api::build_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", tunables.port)).await?;
    info!(port = tunables.port, "listening");

    let runtime = Arc::new(Runtime::new(prod, Some(dev), tunables.poll_interval));
    let shutdown = runtime.shutdown_token();

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown.cancelled().await;
    });

    let (server_result, ()) = tokio::join!(server, runtime.run());
    server_result?;

    Ok(())
}
