//! Database initialization
//!
//! Opens (creating if needed) the SQLite database in the root folder and
//! creates the timetable tables. All `CREATE` statements are idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL lets readers poll results while a course transaction commits
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_timetable_tables(&pool).await?;

    Ok(pool)
}

/// Create the proposal, vote and final timetable tables
pub async fn create_timetable_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS timetable_proposals (
            course_id TEXT NOT NULL,
            option INTEGER NOT NULL,
            position INTEGER NOT NULL,
            schedule_json TEXT NOT NULL,
            reasoning TEXT NOT NULL,
            published_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (course_id, option)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS timetable_votes (
            course_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            option INTEGER NOT NULL,
            cast_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (course_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS final_timetables (
            course_id TEXT PRIMARY KEY,
            option INTEGER NOT NULL,
            schedule_json TEXT NOT NULL,
            reasoning TEXT NOT NULL,
            votes INTEGER NOT NULL,
            finalized_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
