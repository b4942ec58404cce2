//! Item version repository
//!
//! Versions are immutable rows keyed by `(item_id, version)`; the mutable
//! state is the small `(item_id, ref_name) -> version` index. Moving a ref
//! is a single conditional statement, so two writers racing from the same
//! observed head resolve to exactly one winner.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use strata_core::id::{ItemId, ModelId, VersionId};
use strata_core::item::Item;
use strata_core::pagination::{Page, Pagination, Sort};
use strata_core::version::{Ref, Version, VersionedList};
use tracing::{debug, info};

/// Repository for versioned items
pub struct ItemRepository {
    pool: Pool<Sqlite>,
}

impl ItemRepository {
    /// Create a new item repository
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Append an immutable version row. Refs are not persisted here; they
    /// live in the ref index and move through [`ItemRepository::move_ref`].
    pub async fn save_version(&self, item_id: ItemId, version: &Version<Item>) -> Result<()> {
        debug!("Saving version {} of item {}", version.version(), item_id);

        let parents: Vec<String> = version.parents().iter().map(ToString::to_string).collect();
        let parents_json = serde_json::to_string(&parents)?;
        let data = version
            .value()
            .map(serde_json::to_string)
            .transpose()?;
        let model_id = version.value().map(|item| item.model().to_string());

        sqlx::query(
            "INSERT INTO item_versions (item_id, version, parents, created_at, model_id, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(item_id.to_string())
        .bind(version.version().to_string())
        .bind(parents_json)
        .bind(version.time().to_rfc3339())
        .bind(model_id)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Remove a version row that never became reachable (conflict cleanup)
    pub async fn delete_version(&self, item_id: ItemId, version: VersionId) -> Result<()> {
        sqlx::query("DELETE FROM item_versions WHERE item_id = ?1 AND version = ?2")
            .bind(item_id.to_string())
            .bind(version.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Load the full version history of one logical item, time-ascending
    pub async fn find_versions_by_id(&self, item_id: ItemId) -> Result<VersionedList<Item>> {
        debug!("Loading version history of item {}", item_id);

        let rows = sqlx::query(
            "SELECT version, parents, created_at, data FROM item_versions WHERE item_id = ?1",
        )
        .bind(item_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let refs = self.refs_by_item(item_id).await?;
        let mut versions = Vec::with_capacity(rows.len());
        for row in rows {
            versions.push(parse_version_row(&row, &refs)?);
        }
        Ok(VersionedList::from_versions(versions))
    }

    /// Load the version a ref currently points at, if any
    pub async fn find_by_ref(&self, item_id: ItemId, r: &Ref) -> Result<Option<Version<Item>>> {
        let row = sqlx::query(
            "SELECT v.version, v.parents, v.created_at, v.data
             FROM item_versions v
             JOIN item_refs r ON r.item_id = v.item_id AND r.version = v.version
             WHERE v.item_id = ?1 AND r.ref_name = ?2",
        )
        .bind(item_id.to_string())
        .bind(r.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(row) => {
                let refs = self.refs_by_item(item_id).await?;
                Ok(Some(parse_version_row(&row, &refs)?))
            }
            None => Ok(None),
        }
    }

    /// Load an explicit version by id, if present
    pub async fn find_by_version(
        &self,
        item_id: ItemId,
        version: VersionId,
    ) -> Result<Option<Version<Item>>> {
        let row = sqlx::query(
            "SELECT version, parents, created_at, data
             FROM item_versions WHERE item_id = ?1 AND version = ?2",
        )
        .bind(item_id.to_string())
        .bind(version.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(row) => {
                let refs = self.refs_by_item(item_id).await?;
                Ok(Some(parse_version_row(&row, &refs)?))
            }
            None => Ok(None),
        }
    }

    /// Batched lookup of the ref-qualified version of many items. Missing
    /// ids are simply absent from the result, not an error.
    pub async fn find_by_ids(
        &self,
        ids: &[ItemId],
        r: &Ref,
    ) -> Result<HashMap<ItemId, Version<Item>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        debug!("Batch-loading {} items at ref {}", ids.len(), r);

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT v.item_id, v.version, v.parents, v.created_at, v.data
             FROM item_versions v
             JOIN item_refs r ON r.item_id = v.item_id AND r.version = v.version
             WHERE r.ref_name = ? AND v.item_id IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql).bind(r.to_string());
        for id in ids {
            query = query.bind(id.to_string());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(Error::Database)?;

        let refs = self.refs_by_items(ids).await?;
        let empty = HashMap::new();
        let mut result = HashMap::new();
        for row in rows {
            let item_id: ItemId = parse_id(&row.try_get::<String, _>("item_id")?, "item id")?;
            let item_refs = refs.get(&item_id).unwrap_or(&empty);
            result.insert(item_id, parse_version_row(&row, item_refs)?);
        }
        Ok(result)
    }

    /// Page through the ref-qualified versions of a model's items. Order is
    /// creation time ascending unless the sort is reverted.
    pub async fn list_by_model(
        &self,
        model_id: ModelId,
        r: &Ref,
        pagination: Pagination,
        sort: &Sort,
    ) -> Result<Page<Version<Item>>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)
             FROM item_versions v
             JOIN item_refs r ON r.item_id = v.item_id AND r.version = v.version
             WHERE v.model_id = ?1 AND r.ref_name = ?2",
        )
        .bind(model_id.to_string())
        .bind(r.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        // sort keys map onto indexed columns; anything else is rejected
        // rather than silently falling back to creation time
        let column = match sort.key.as_str() {
            "createdAt" => "v.created_at",
            other => {
                return Err(Error::Core(strata_core::Error::validation(format!(
                    "unsupported sort key '{}'",
                    other
                ))))
            }
        };
        let order = if sort.reverted { "DESC" } else { "ASC" };
        let sql = format!(
            "SELECT v.item_id, v.version, v.parents, v.created_at, v.data
             FROM item_versions v
             JOIN item_refs r ON r.item_id = v.item_id AND r.version = v.version
             WHERE v.model_id = ?1 AND r.ref_name = ?2
             ORDER BY {column} {order}
             LIMIT ?3 OFFSET ?4"
        );
        let rows = sqlx::query(&sql)
            .bind(model_id.to_string())
            .bind(r.to_string())
            .bind(pagination.limit as i64)
            .bind(pagination.offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let mut page_ids = Vec::with_capacity(rows.len());
        for row in &rows {
            page_ids.push(parse_id::<ItemId>(
                &row.try_get::<String, _>("item_id")?,
                "item id",
            )?);
        }
        let refs = self.refs_by_items(&page_ids).await?;
        let empty = HashMap::new();
        let mut items = Vec::with_capacity(rows.len());
        for (row, item_id) in rows.iter().zip(page_ids) {
            let item_refs = refs.get(&item_id).unwrap_or(&empty);
            items.push(parse_version_row(row, item_refs)?);
        }
        Ok(Page {
            items,
            total: total as u64,
        })
    }

    /// All current (non-tombstone) versions of a model's items, for
    /// cross-item checks such as unique fields
    pub async fn find_latest_by_model(&self, model_id: ModelId) -> Result<Vec<Version<Item>>> {
        let rows = sqlx::query(
            "SELECT v.item_id, v.version, v.parents, v.created_at, v.data
             FROM item_versions v
             JOIN item_refs r ON r.item_id = v.item_id AND r.version = v.version
             WHERE v.model_id = ?1 AND r.ref_name = ?2",
        )
        .bind(model_id.to_string())
        .bind(Ref::Latest.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut versions = Vec::with_capacity(rows.len());
        for row in rows {
            versions.push(parse_version_row(&row, &HashMap::new())?);
        }
        Ok(versions)
    }

    /// The version a ref currently points at, without loading the version
    pub async fn current_ref(&self, item_id: ItemId, r: &Ref) -> Result<Option<VersionId>> {
        let row = sqlx::query(
            "SELECT version FROM item_refs WHERE item_id = ?1 AND ref_name = ?2",
        )
        .bind(item_id.to_string())
        .bind(r.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(|row| parse_id(&row.try_get::<String, _>("version")?, "version id"))
            .transpose()
    }

    /// Atomically move a ref, checking the expected current holder.
    ///
    /// With `expected_from = Some(v)` the move succeeds only while the ref
    /// still points at `v`; with `None` it succeeds only while the ref does
    /// not exist yet. Either mismatch fails with `Conflict` so the caller
    /// retries the whole read-modify-write with a fresh read.
    pub async fn move_ref(
        &self,
        item_id: ItemId,
        r: &Ref,
        to: VersionId,
        expected_from: Option<VersionId>,
    ) -> Result<()> {
        debug!("Moving ref {} of item {} to {}", r, item_id, to);

        let affected = match expected_from {
            Some(expected) => sqlx::query(
                "UPDATE item_refs SET version = ?1
                 WHERE item_id = ?2 AND ref_name = ?3 AND version = ?4",
            )
            .bind(to.to_string())
            .bind(item_id.to_string())
            .bind(r.to_string())
            .bind(expected.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?
            .rows_affected(),
            None => sqlx::query(
                "INSERT OR IGNORE INTO item_refs (item_id, ref_name, version)
                 VALUES (?1, ?2, ?3)",
            )
            .bind(item_id.to_string())
            .bind(r.to_string())
            .bind(to.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?
            .rows_affected(),
        };

        if affected == 0 {
            return Err(Error::Conflict(format!(
                "ref {} of item {} moved concurrently",
                r, item_id
            )));
        }
        info!("Ref {} of item {} now points at {}", r, item_id, to);
        Ok(())
    }

    /// Detach a ref from whatever version holds it
    pub async fn remove_ref(&self, item_id: ItemId, r: &Ref) -> Result<()> {
        let affected = sqlx::query(
            "DELETE FROM item_refs WHERE item_id = ?1 AND ref_name = ?2",
        )
        .bind(item_id.to_string())
        .bind(r.to_string())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?
        .rows_affected();

        if affected == 0 {
            return Err(Error::not_found("Ref", format!("{}@{}", r, item_id)));
        }
        Ok(())
    }

    /// Count logical items (distinct ids, including tombstoned ones)
    pub async fn count(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT item_id) FROM item_versions")
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(count)
    }

    async fn refs_by_item(&self, item_id: ItemId) -> Result<HashMap<VersionId, BTreeSet<Ref>>> {
        let rows = sqlx::query(
            "SELECT ref_name, version FROM item_refs WHERE item_id = ?1",
        )
        .bind(item_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut refs: HashMap<VersionId, BTreeSet<Ref>> = HashMap::new();
        for row in rows {
            let version: VersionId =
                parse_id(&row.try_get::<String, _>("version")?, "version id")?;
            let name: Ref = row.try_get::<String, _>("ref_name")?.into();
            refs.entry(version).or_default().insert(name);
        }
        Ok(refs)
    }

    /// One ref-index query for a whole batch of items, grouped per item
    async fn refs_by_items(
        &self,
        ids: &[ItemId],
    ) -> Result<HashMap<ItemId, HashMap<VersionId, BTreeSet<Ref>>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT item_id, ref_name, version FROM item_refs WHERE item_id IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(Error::Database)?;

        let mut refs: HashMap<ItemId, HashMap<VersionId, BTreeSet<Ref>>> = HashMap::new();
        for row in rows {
            let item_id: ItemId = parse_id(&row.try_get::<String, _>("item_id")?, "item id")?;
            let version: VersionId =
                parse_id(&row.try_get::<String, _>("version")?, "version id")?;
            let name: Ref = row.try_get::<String, _>("ref_name")?.into();
            refs.entry(item_id)
                .or_default()
                .entry(version)
                .or_default()
                .insert(name);
        }
        Ok(refs)
    }
}

fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::Internal(anyhow::anyhow!("malformed {} '{}' in storage", what, raw)))
}

fn parse_version_row(
    row: &sqlx::sqlite::SqliteRow,
    refs: &HashMap<VersionId, BTreeSet<Ref>>,
) -> Result<Version<Item>> {
    let version: VersionId = parse_id(&row.try_get::<String, _>("version")?, "version id")?;
    let parents_json: String = row.try_get("parents")?;
    let parent_strings: Vec<String> = serde_json::from_str(&parents_json)?;
    let mut parents = BTreeSet::new();
    for p in parent_strings {
        parents.insert(parse_id(&p, "parent version id")?);
    }
    let created_at: String = row.try_get("created_at")?;
    let time: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(anyhow::anyhow!("malformed timestamp in storage: {}", e)))?
        .with_timezone(&Utc);
    let data: Option<String> = row.try_get("data")?;
    let value: Option<Item> = data.as_deref().map(serde_json::from_str).transpose()?;
    let version_refs = refs.get(&version).cloned().unwrap_or_default();
    Ok(Version::from_parts(version, parents, version_refs, time, value))
}
