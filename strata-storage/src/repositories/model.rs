//! Model repository

use crate::{Error, Result};
use sqlx::{Pool, Row, Sqlite};
use strata_core::id::{ModelId, ProjectId};
use strata_core::model::Model;
use tracing::debug;

/// Repository for model aggregates
pub struct ModelRepository {
    pool: Pool<Sqlite>,
}

impl ModelRepository {
    /// Create a new model repository
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Insert or update a model. Resaving the same id upserts; a different
    /// model taking an occupied `(project, key)` pair surfaces as a
    /// constraint violation instead of replacing the existing row.
    pub async fn save(&self, model: &Model) -> Result<()> {
        debug!("Saving model {} ({})", model.key(), model.id());
        let data = serde_json::to_string(model)?;
        sqlx::query(
            "INSERT INTO models (id, project_id, key, data) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO UPDATE
             SET project_id = excluded.project_id, key = excluded.key, data = excluded.data",
        )
        .bind(model.id().to_string())
        .bind(model.project().to_string())
        .bind(model.key().to_string())
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.message().contains("UNIQUE") => {
                Error::ConstraintViolation(format!("model key '{}' already taken", model.key()))
            }
            _ => Error::Database(e),
        })?;
        Ok(())
    }

    /// Find a model by ID
    pub async fn find_by_id(&self, id: ModelId) -> Result<Option<Model>> {
        let row = sqlx::query("SELECT data FROM models WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.map(|row| -> Result<Model> {
            let data: String = row.try_get("data")?;
            Ok(serde_json::from_str(&data)?)
        })
        .transpose()
    }

    /// Find a model by its project-scoped key
    pub async fn find_by_key(&self, project: ProjectId, key: &str) -> Result<Option<Model>> {
        let row = sqlx::query("SELECT data FROM models WHERE project_id = ?1 AND key = ?2")
            .bind(project.to_string())
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.map(|row| -> Result<Model> {
            let data: String = row.try_get("data")?;
            Ok(serde_json::from_str(&data)?)
        })
        .transpose()
    }

    /// Count stored models
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM models")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count)
    }
}
