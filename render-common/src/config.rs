//! Environment-variable configuration resolution
//!
//! The worker has no database-backed settings table of its own — every
//! tunable here resolves from the environment, falling back to a compiled
//! default.

use std::time::Duration;

/// One queue binding's Supabase credentials, resolved from the environment.
///
/// DEV is the required binding and accepts the legacy unprefixed variable
/// names for backward compatibility with single-environment deployments;
/// PROD is optional and only recognizes the `SUPABASE_PROD_*` pair.
#[derive(Debug, Clone)]
pub struct SupabaseCredentials {
    pub url: String,
    pub service_role_key: String,
}

impl SupabaseCredentials {
    /// Resolve PROD credentials: `SUPABASE_PROD_URL`/`SUPABASE_PROD_SERVICE_ROLE_KEY`
    /// only — no legacy fallback, since the bare names belong to DEV.
    pub fn resolve_prod() -> Option<Self> {
        let url = std::env::var("SUPABASE_PROD_URL").ok()?;
        let service_role_key = std::env::var("SUPABASE_PROD_SERVICE_ROLE_KEY").ok()?;
        Some(Self { url, service_role_key })
    }

    /// Resolve DEV credentials: `SUPABASE_DEV_URL`/`SUPABASE_DEV_SERVICE_ROLE_KEY`,
    /// falling back to the legacy bare `SUPABASE_URL`/`SUPABASE_SERVICE_ROLE_KEY`
    /// names if the `_DEV_` variant is absent.
    pub fn resolve_dev() -> Option<Self> {
        let url = std::env::var("SUPABASE_DEV_URL")
            .or_else(|_| std::env::var("SUPABASE_URL"))
            .ok()?;
        let service_role_key = std::env::var("SUPABASE_DEV_SERVICE_ROLE_KEY")
            .or_else(|_| std::env::var("SUPABASE_SERVICE_ROLE_KEY"))
            .ok()?;
        Some(Self { url, service_role_key })
    }
}

/// TTS provider credentials, resolved once at startup and treated as
/// process-global read-only state.
#[derive(Debug, Clone, Default)]
pub struct TtsCredentials {
    pub openai_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
}

impl TtsCredentials {
    pub fn resolve() -> Self {
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            elevenlabs_api_key: std::env::var("ELEVENLABS_API_KEY").ok(),
        }
    }
}

/// Worker-wide tunables.
#[derive(Debug, Clone)]
pub struct WorkerTunables {
    pub poll_interval: Duration,
    pub max_jobs_per_cycle: usize,
    pub port: u16,
    pub lease_ttl: Duration,
    pub max_attempts: i32,
}

impl Default for WorkerTunables {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(300_000),
            max_jobs_per_cycle: 5,
            port: 3002,
            lease_ttl: Duration::from_secs(15 * 60),
            max_attempts: 3,
        }
    }
}

impl WorkerTunables {
    pub fn resolve() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: env_millis("POLL_INTERVAL_MS", defaults.poll_interval),
            max_jobs_per_cycle: env_usize("MAX_JOBS_PER_CYCLE", defaults.max_jobs_per_cycle),
            port: env_port(defaults.port),
            lease_ttl: defaults.lease_ttl,
            max_attempts: defaults.max_attempts,
        }
    }
}

fn env_millis(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_port(default: u16) -> u16 {
    // WORKER_PORT takes priority over the generic PORT, so a process
    // manager can set one generic PORT env var across several services
    // while still letting this one be pinned explicitly.
    std::env::var("WORKER_PORT")
        .or_else(|_| std::env::var("PORT"))
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn tunables_default_matches_spec() {
        let t = WorkerTunables::default();
        assert_eq!(t.poll_interval, Duration::from_millis(300_000));
        assert_eq!(t.max_jobs_per_cycle, 5);
        assert_eq!(t.port, 3002);
        assert_eq!(t.lease_ttl, Duration::from_secs(900));
        assert_eq!(t.max_attempts, 3);
    }

    #[test]
    fn tunables_resolve_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("POLL_INTERVAL_MS", "1000");
        std::env::set_var("MAX_JOBS_PER_CYCLE", "2");
        std::env::set_var("WORKER_PORT", "9999");

        let t = WorkerTunables::resolve();
        assert_eq!(t.poll_interval, Duration::from_millis(1000));
        assert_eq!(t.max_jobs_per_cycle, 2);
        assert_eq!(t.port, 9999);

        std::env::remove_var("POLL_INTERVAL_MS");
        std::env::remove_var("MAX_JOBS_PER_CYCLE");
        std::env::remove_var("WORKER_PORT");
    }
}
