//! Asset repository
//!
//! Stores the slim projection records only; binary payloads live elsewhere.

use crate::{Error, Result};
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;
use strata_core::asset::Asset;
use strata_core::id::AssetId;
use tracing::debug;

/// Repository for asset projection records
pub struct AssetRepository {
    pool: Pool<Sqlite>,
}

impl AssetRepository {
    /// Create a new asset repository
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Insert or replace an asset record
    pub async fn save(&self, asset: &Asset) -> Result<()> {
        debug!("Saving asset {} ({})", asset.file_name, asset.id);
        let data = serde_json::to_string(asset)?;
        sqlx::query("INSERT OR REPLACE INTO assets (id, data) VALUES (?1, ?2)")
            .bind(asset.id.to_string())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Find an asset by ID
    pub async fn find_by_id(&self, id: AssetId) -> Result<Option<Asset>> {
        let row = sqlx::query("SELECT data FROM assets WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.map(|row| -> Result<Asset> {
            let data: String = row.try_get("data")?;
            Ok(serde_json::from_str(&data)?)
        })
        .transpose()
    }

    /// Batched lookup; missing ids are simply absent from the result
    pub async fn find_by_ids(&self, ids: &[AssetId]) -> Result<HashMap<AssetId, Asset>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT data FROM assets WHERE id IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(Error::Database)?;

        let mut result = HashMap::new();
        for row in rows {
            let data: String = row.try_get("data")?;
            let asset: Asset = serde_json::from_str(&data)?;
            result.insert(asset.id, asset);
        }
        Ok(result)
    }

    /// Count stored assets
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assets")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count)
    }
}
