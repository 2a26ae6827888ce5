//! Worker runtime: multi-environment initialization, realtime +
//! polling dispatch, graceful shutdown, and the `isProcessing` guard.

mod environment;

pub use environment::{Environment, EnvironmentSnapshot};

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Ties the PROD and DEV [`Environment`]s together and drives the
/// activation triggers: realtime push, polling fallback, and an immediate
/// startup drain.
pub struct Runtime {
    prod: Option<Arc<Environment>>,
    dev: Option<Arc<Environment>>,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl Runtime {
    pub fn new(prod: Option<Arc<Environment>>, dev: Option<Arc<Environment>>, poll_interval: Duration) -> Self {
        Self {
            prod,
            dev,
            poll_interval,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Drive the runtime until SIGTERM/SIGINT. Startup always drains
    /// backlog once immediately.
    pub async fn run(self: Arc<Self>) {
        info!("processing backlog on startup");
        self.process_all().await;

        let realtime = self.clone().spawn_realtime_dispatch();
        let poll = self.clone().spawn_poll_dispatch();
        let shutdown_signal = self.clone().spawn_shutdown_listener();

        let _ = tokio::join!(realtime, poll, shutdown_signal);
        info!("runtime shut down");
    }

    /// PROD is always drained before DEV so prod traffic can't be starved by
    /// dev.
    async fn process_all(&self) {
        if let Some(prod) = &self.prod {
            prod.process().await;
        }
        if let Some(dev) = &self.dev {
            dev.process().await;
        }
    }

    fn spawn_realtime_dispatch(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut streams = Vec::new();
            if let Some(prod) = self.prod.clone() {
                streams.push(prod.insert_stream());
            }
            if let Some(dev) = self.dev.clone() {
                streams.push(dev.insert_stream());
            }
            let mut merged = futures::stream::select_all(streams);
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    event = merged.next() => {
                        match event {
                            Some((env, _inserted)) => env.process().await,
                            None => break,
                        }
                    }
                }
            }
        })
    }

    fn spawn_poll_dispatch(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.tick().await; // first tick fires immediately; startup drain already covered it
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    _ = ticker.tick() => self.process_all().await,
                }
            }
        })
    }

    fn spawn_shutdown_listener(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let ctrl_c = signal::ctrl_c();
            #[cfg(unix)]
            let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
            #[cfg(unix)]
            tokio::select! {
                _ = ctrl_c => {},
                _ = terminate.recv() => {},
            };
            #[cfg(not(unix))]
            {
                let _ = ctrl_c.await;
            }
            warn!("shutdown signal received; finishing in-flight jobs and exiting");
            self.shutdown.cancel();
        })
    }
}
