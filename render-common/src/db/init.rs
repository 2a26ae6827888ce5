//! Database initialization
//!
//! Bootstraps the Postgres schema the queue client depends on:
//! `audio_job_queue` and `tracks`. In production this schema already exists
//! (Supabase migrations own it); this bootstrap exists so `cargo test` and a
//! bare local Postgres can stand the worker up without a separate migration
//! step.

use crate::Result;
use sqlx::PgPool;

/// Connect to `database_url` and ensure the job-queue schema exists.
pub async fn init_database(database_url: &str) -> Result<PgPool> {
    let pool = PgPool::connect(database_url).await?;
    create_audio_job_queue_table(&pool).await?;
    create_tracks_table(&pool).await?;
    create_insert_notify_trigger(&pool).await?;
    Ok(pool)
}

async fn create_audio_job_queue_table(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audio_job_queue (
            id TEXT PRIMARY KEY,
            track_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
            payload JSONB NOT NULL,
            progress INTEGER NOT NULL DEFAULT 0,
            stage TEXT NOT NULL DEFAULT '',
            error TEXT,
            attempts INTEGER NOT NULL DEFAULT 0,
            leased_until TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS audio_job_queue_pending_idx
            ON audio_job_queue (created_at)
            WHERE status = 'pending'
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_tracks_table(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracks (
            id TEXT PRIMARY KEY,
            audio_url TEXT,
            duration_seconds INTEGER,
            status TEXT NOT NULL DEFAULT 'draft'
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// `NOTIFY` on insert gives the realtime subscription a push channel via `LISTEN audio_job_queue_inserts`,
/// independent of the polling fallback.
async fn create_insert_notify_trigger(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE OR REPLACE FUNCTION notify_audio_job_insert() RETURNS trigger AS $$
        BEGIN
            PERFORM pg_notify('audio_job_queue_inserts', NEW.id);
            RETURN NEW;
        END;
        $$ LANGUAGE plpgsql
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        DROP TRIGGER IF EXISTS audio_job_queue_insert_trigger ON audio_job_queue
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER audio_job_queue_insert_trigger
            AFTER INSERT ON audio_job_queue
            FOR EACH ROW EXECUTE FUNCTION notify_audio_job_insert()
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
