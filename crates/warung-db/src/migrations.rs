//! # Database Migrations
//!
//! SQL files from `migrations/sqlite/` are embedded into the binary at
//! compile time and applied in filename order. Applied migrations are
//! tracked in `_sqlx_migrations`, so running them again is a no-op.
//!
//! Rules for new migrations: next sequence number, `NNN_description.sql`,
//! idempotent SQL, and never edit an existing file - always add a new one.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies all pending migrations. Idempotent and transactional per file.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("checking for pending migrations");
    MIGRATOR.run(pool).await?;
    info!("all migrations applied");
    Ok(())
}

/// Returns (embedded, applied) migration counts, for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);
    Ok((total, applied as usize))
}
