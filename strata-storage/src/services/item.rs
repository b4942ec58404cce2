//! Item service implementing the write operations
//!
//! Every mutation appends a new immutable version and moves the `latest`
//! ref with a compare-and-swap against the observed head. A lost race
//! surfaces as a conflict; callers retry the whole read-modify-write with a
//! fresh read, bounded by [`MAX_CONFLICT_RETRIES`].

use crate::repositories::{ItemRepository, SchemaRepository};
use crate::{Error, Result};
use std::sync::Arc;
use strata_core::cancellation::CancellationFlag;
use strata_core::id::{ItemId, ModelId, SchemaId};
use strata_core::item::{CreateItemParam, Item, ItemFieldParam, UpdateItemParam};
use strata_core::operator::Operator;
use strata_core::schema::Schema;
use strata_core::version::{Ref, Version, VersionOrRef, VersionedList};
use tracing::{debug, info, warn};

/// Bounded retry count for conflicted updates
pub const MAX_CONFLICT_RETRIES: usize = 3;

/// Options controlling item deletion
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Also tombstone the item's metadata item. Off by default; the
    /// metadata item is otherwise left orphaned and must be deleted
    /// explicitly.
    pub cascade_metadata: bool,
}

/// One row of a bulk import
#[derive(Debug, Clone)]
pub struct ImportItemParam {
    /// Target item for an update; `None` inserts a new item
    pub item: Option<ItemId>,
    pub schema: SchemaId,
    pub model: ModelId,
    pub fields: Vec<ItemFieldParam>,
}

/// Aggregate outcome of a bulk import. Rows already committed are not
/// rolled back on failure or cancellation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportResult {
    pub inserted: u64,
    pub updated: u64,
    pub ignored: u64,
    pub failed: u64,
    pub errors: Vec<ImportRowError>,
}

/// A per-row import failure, reported in aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRowError {
    pub index: usize,
    pub message: String,
}

/// Service for creating, updating, publishing and deleting items
pub struct ItemService {
    items: Arc<ItemRepository>,
    schemas: Arc<SchemaRepository>,
}

impl ItemService {
    /// Create a new item service
    pub fn new(items: Arc<ItemRepository>, schemas: Arc<SchemaRepository>) -> Self {
        Self { items, schemas }
    }

    /// Create an item: validate field values against the schema, append
    /// version 1, and attach the `latest` ref.
    pub async fn create(
        &self,
        param: CreateItemParam,
        operator: &Operator,
    ) -> Result<Version<Item>> {
        let schema = self.require_schema(param.schema).await?;
        let item = Item::new(param, &schema, operator)?;
        self.check_unique(&schema, &item).await?;

        let item_id = item.id();
        let version = Version::initial(item);
        self.items.save_version(item_id, &version).await?;
        self.items
            .move_ref(item_id, &Ref::Latest, version.version(), None)
            .await?;

        info!("Created item {} at version {}", item_id, version.version());
        Ok(version)
    }

    /// Update an item: replace the named field values, preserve the rest,
    /// append a new version whose parent is the observed head, and move
    /// `latest` with a compare-and-swap. A concurrent writer that advanced
    /// the head first wins; this call fails with a conflict.
    pub async fn update(
        &self,
        item_id: ItemId,
        param: UpdateItemParam,
        operator: &Operator,
    ) -> Result<Version<Item>> {
        let head = self
            .items
            .find_by_ref(item_id, &Ref::Latest)
            .await?
            .ok_or_else(|| Error::not_found("Item", item_id.to_string()))?;
        let current = head
            .value()
            .cloned()
            .ok_or_else(|| Error::not_found("Item", item_id.to_string()))?;
        let schema = self.require_schema(current.schema()).await?;
        let updated = current.apply_update(param, &schema, operator)?;
        self.check_unique(&schema, &updated).await?;

        let version = Version::child(updated, head.version());
        self.items.save_version(item_id, &version).await?;
        if let Err(e) = self
            .items
            .move_ref(item_id, &Ref::Latest, version.version(), Some(head.version()))
            .await
        {
            // lost the race; the appended row is unreachable, drop it
            let _ = self.items.delete_version(item_id, version.version()).await;
            return Err(e);
        }

        info!("Updated item {} to version {}", item_id, version.version());
        Ok(version)
    }

    /// Update with a bounded number of retries on conflict, re-reading the
    /// head each attempt
    pub async fn update_with_retry(
        &self,
        item_id: ItemId,
        param: UpdateItemParam,
        operator: &Operator,
    ) -> Result<Version<Item>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.update(item_id, param.clone(), operator).await {
                Err(e) if e.is_conflict() && attempt < MAX_CONFLICT_RETRIES => {
                    warn!(
                        "Update of item {} lost ref race (attempt {}), retrying",
                        item_id, attempt
                    );
                }
                other => return other,
            }
        }
    }

    /// Publish: move the `public` ref to the current `latest` version.
    /// No new version is created.
    pub async fn publish(&self, item_id: ItemId) -> Result<Version<Item>> {
        let head = self
            .items
            .find_by_ref(item_id, &Ref::Latest)
            .await?
            .ok_or_else(|| Error::not_found("Item", item_id.to_string()))?;
        if head.is_tombstone() {
            return Err(Error::Core(strata_core::Error::validation(
                "cannot publish a deleted item",
            )));
        }
        let expected = self.items.current_ref(item_id, &Ref::Public).await?;
        if expected == Some(head.version()) {
            debug!("Item {} already published at {}", item_id, head.version());
            return Ok(head);
        }
        self.items
            .move_ref(item_id, &Ref::Public, head.version(), expected)
            .await?;
        info!("Published item {} at version {}", item_id, head.version());
        // reload so the returned version carries the public ref
        self.find(item_id, &VersionOrRef::Ref(Ref::Public)).await
    }

    /// Unpublish: detach the `public` ref. Prior versions stay reachable
    /// by id.
    pub async fn unpublish(&self, item_id: ItemId) -> Result<()> {
        self.items.remove_ref(item_id, &Ref::Public).await?;
        info!("Unpublished item {}", item_id);
        Ok(())
    }

    /// Delete: append a tombstone version and move `latest` onto it. The
    /// version history remains reachable by explicit id.
    pub async fn delete(&self, item_id: ItemId, options: DeleteOptions) -> Result<()> {
        let metadata_item = self.delete_one(item_id).await?;
        if options.cascade_metadata {
            if let Some(metadata_id) = metadata_item {
                match self.delete_one(metadata_id).await {
                    Ok(_) => {}
                    // already gone is fine for a cascade
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    async fn delete_one(&self, item_id: ItemId) -> Result<Option<ItemId>> {
        let head = self
            .items
            .find_by_ref(item_id, &Ref::Latest)
            .await?
            .ok_or_else(|| Error::not_found("Item", item_id.to_string()))?;
        let metadata_item = match head.value() {
            Some(item) => item.metadata_item(),
            None => return Err(Error::not_found("Item", item_id.to_string())),
        };

        let tombstone: Version<Item> = Version::tombstone(head.version());
        self.items.save_version(item_id, &tombstone).await?;
        if let Err(e) = self
            .items
            .move_ref(item_id, &Ref::Latest, tombstone.version(), Some(head.version()))
            .await
        {
            let _ = self
                .items
                .delete_version(item_id, tombstone.version())
                .await;
            return Err(e);
        }
        info!("Deleted item {} (tombstone {})", item_id, tombstone.version());
        Ok(metadata_item)
    }

    /// Resolve an item by ref name or explicit version id
    pub async fn find(&self, item_id: ItemId, target: &VersionOrRef) -> Result<Version<Item>> {
        let found = match target {
            VersionOrRef::Ref(r) => self.items.find_by_ref(item_id, r).await?,
            VersionOrRef::Version(v) => self.items.find_by_version(item_id, *v).await?,
        };
        found.ok_or_else(|| Error::not_found("Item", item_id.to_string()))
    }

    /// Load the full version history of an item
    pub async fn find_versions(&self, item_id: ItemId) -> Result<VersionedList<Item>> {
        let list = self.items.find_versions_by_id(item_id).await?;
        if list.is_empty() {
            return Err(Error::not_found("Item", item_id.to_string()));
        }
        Ok(list)
    }

    /// Bulk import: each row is validated and committed independently.
    /// Failures are accumulated per row instead of aborting the batch, and
    /// the cancellation flag is checked between rows. Rows already written
    /// are never rolled back.
    pub async fn import(
        &self,
        rows: Vec<ImportItemParam>,
        operator: &Operator,
        cancel: &CancellationFlag,
    ) -> Result<ImportResult> {
        info!("Importing {} items", rows.len());
        let mut result = ImportResult::default();

        for (index, row) in rows.into_iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("Import cancelled after {} rows", index);
                break;
            }
            let outcome = self.import_row(row, operator).await;
            match outcome {
                Ok(RowOutcome::Inserted) => result.inserted += 1,
                Ok(RowOutcome::Updated) => result.updated += 1,
                Ok(RowOutcome::Ignored) => result.ignored += 1,
                Err(e) => {
                    result.failed += 1;
                    result.errors.push(ImportRowError {
                        index,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Import finished: {} inserted, {} updated, {} ignored, {} failed",
            result.inserted, result.updated, result.ignored, result.failed
        );
        Ok(result)
    }

    async fn import_row(&self, row: ImportItemParam, operator: &Operator) -> Result<RowOutcome> {
        match row.item {
            Some(item_id) => {
                let head = self.items.find_by_ref(item_id, &Ref::Latest).await?;
                match head {
                    Some(v) if !v.is_tombstone() => {
                        self.update(
                            item_id,
                            UpdateItemParam {
                                fields: row.fields,
                                metadata_item: None,
                            },
                            operator,
                        )
                        .await?;
                        Ok(RowOutcome::Updated)
                    }
                    // unknown or deleted target: skip rather than resurrect
                    _ => Ok(RowOutcome::Ignored),
                }
            }
            None => {
                self.create(
                    CreateItemParam {
                        schema: row.schema,
                        model: row.model,
                        metadata_item: None,
                        original_item: None,
                        is_metadata: false,
                        fields: row.fields,
                    },
                    operator,
                )
                .await?;
                Ok(RowOutcome::Inserted)
            }
        }
    }

    async fn require_schema(&self, id: SchemaId) -> Result<Schema> {
        self.schemas
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Schema", id.to_string()))
    }

    /// Enforce unique-flagged fields across the current items of the model.
    /// Tombstoned items do not participate.
    async fn check_unique(&self, schema: &Schema, item: &Item) -> Result<()> {
        let unique_fields: Vec<_> = schema.fields().iter().filter(|f| f.unique()).collect();
        if unique_fields.is_empty() {
            return Ok(());
        }
        let others = self.items.find_latest_by_model(item.model()).await?;
        for field in unique_fields {
            let Some(candidate) = item.field(field.id()) else {
                continue;
            };
            if candidate.value().is_empty() {
                continue;
            }
            for other in &others {
                let Some(other_item) = other.value() else {
                    continue;
                };
                if other_item.id() == item.id() {
                    continue;
                }
                if other_item.field(field.id()).map(|f| f.value()) == Some(candidate.value()) {
                    return Err(Error::ConstraintViolation(format!(
                        "field '{}' must be unique across the model",
                        field.key()
                    )));
                }
            }
        }
        Ok(())
    }
}

enum RowOutcome {
    Inserted,
    Updated,
    Ignored,
}
