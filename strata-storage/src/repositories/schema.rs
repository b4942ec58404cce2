//! Schema repository

use crate::{Error, Result};
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;
use strata_core::id::SchemaId;
use strata_core::schema::Schema;
use tracing::debug;

/// Repository for schema aggregates, stored as JSON documents
pub struct SchemaRepository {
    pool: Pool<Sqlite>,
}

impl SchemaRepository {
    /// Create a new schema repository
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Insert or replace a schema
    pub async fn save(&self, schema: &Schema) -> Result<()> {
        debug!("Saving schema {}", schema.id());
        let data = serde_json::to_string(schema)?;
        sqlx::query("INSERT OR REPLACE INTO schemas (id, data) VALUES (?1, ?2)")
            .bind(schema.id().to_string())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Find a schema by ID
    pub async fn find_by_id(&self, id: SchemaId) -> Result<Option<Schema>> {
        let row = sqlx::query("SELECT data FROM schemas WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.map(|row| -> Result<Schema> {
            let data: String = row.try_get("data")?;
            Ok(serde_json::from_str(&data)?)
        })
        .transpose()
    }

    /// Batched lookup; missing ids are simply absent from the result
    pub async fn find_by_ids(&self, ids: &[SchemaId]) -> Result<HashMap<SchemaId, Schema>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT data FROM schemas WHERE id IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(Error::Database)?;

        let mut result = HashMap::new();
        for row in rows {
            let data: String = row.try_get("data")?;
            let schema: Schema = serde_json::from_str(&data)?;
            result.insert(schema.id(), schema);
        }
        Ok(result)
    }

    /// Delete a schema
    pub async fn delete(&self, id: SchemaId) -> Result<()> {
        let affected = sqlx::query("DELETE FROM schemas WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?
            .rows_affected();
        if affected == 0 {
            return Err(Error::not_found("Schema", id.to_string()));
        }
        Ok(())
    }

    /// Count stored schemas
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schemas")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count)
    }
}
