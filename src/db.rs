use log::{debug, info};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::errors::{DbError, DbResult};

// Embed migration SQL files at compile time
const MIGRATION_INITIAL: &str = include_str!("../migrations/20250601000000_initial.sql");
const MIGRATION_EXPORT_JOBS: &str =
    include_str!("../migrations/20250614000000_create_export_jobs.sql");

const MIGRATIONS: &[(&str, &str)] = &[
    ("20250601000000_initial.sql", MIGRATION_INITIAL),
    ("20250614000000_create_export_jobs.sql", MIGRATION_EXPORT_JOBS),
];

pub async fn connect(database_url: &str) -> DbResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// Apply any migrations not yet recorded in the `_migrations` ledger.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .execute(pool)
    .await?;

    for (name, sql) in MIGRATIONS {
        let applied: Option<(String,)> =
            sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                .bind(name)
                .fetch_optional(pool)
                .await?;
        if applied.is_some() {
            debug!("migration {} already applied", name);
            continue;
        }

        let mut tx = pool.begin().await?;
        for statement in sql.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| DbError::Migration(format!("{name}: {e}")))?;
        }
        sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!("applied migration {}", name);
    }

    Ok(())
}

// A pooled `sqlite::memory:` gives every connection its own database, so the
// test pool is pinned to a single connection.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .expect("pragma");
    run_migrations(&pool).await.expect("migrations apply");
    pool
}
