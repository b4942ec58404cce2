//! Database schema setup
//!
//! The engine stores every aggregate as a JSON document row; item versions
//! and the `(item, ref) -> version` index get their own tables so the
//! ref-move compare-and-swap is a single conditional statement.

use crate::{Error, Result};
use sqlx::{Pool, Sqlite};
use tracing::info;

const DDL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS schemas (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS models (
        id TEXT PRIMARY KEY,
        project_id TEXT NOT NULL,
        key TEXT NOT NULL,
        data TEXT NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_models_project_key ON models (project_id, key)",
    "CREATE TABLE IF NOT EXISTS item_versions (
        item_id TEXT NOT NULL,
        version TEXT NOT NULL,
        parents TEXT NOT NULL,
        created_at TEXT NOT NULL,
        model_id TEXT,
        data TEXT,
        PRIMARY KEY (item_id, version)
    )",
    "CREATE INDEX IF NOT EXISTS idx_item_versions_model ON item_versions (model_id)",
    "CREATE TABLE IF NOT EXISTS item_refs (
        item_id TEXT NOT NULL,
        ref_name TEXT NOT NULL,
        version TEXT NOT NULL,
        PRIMARY KEY (item_id, ref_name)
    )",
    "CREATE TABLE IF NOT EXISTS assets (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL
    )",
];

/// Create all tables and indexes if they do not exist yet
pub async fn run(pool: &Pool<Sqlite>) -> Result<()> {
    info!("Running database migrations");
    for statement in DDL {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;
    }
    info!("Database migrations completed");
    Ok(())
}
