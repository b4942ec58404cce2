//! Batched resolution of weak references
//!
//! Items store assets, references, and metadata links as bare ids. The
//! resolver projects a page of item versions into a view with the linked
//! records attached, issuing one batched lookup per entity kind instead of
//! one query per item. Ids that no longer resolve (deleted assets,
//! tombstoned items) are silently omitted; a stale link is not an error.

use crate::repositories::{AssetRepository, ItemRepository, SchemaRepository};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use strata_core::asset::Asset;
use strata_core::id::{AssetId, ItemId, SchemaId};
use strata_core::item::Item;
use strata_core::schema::{Schema, TypeProperty};
use strata_core::version::{Ref, Version};
use tracing::debug;

/// A page of items with their linked records attached
#[derive(Debug, Clone)]
pub struct ResolvedView {
    pub items: Vec<ResolvedItem>,
    /// Schemas backing group-typed fields, keyed by schema id
    pub group_schemas: HashMap<SchemaId, Schema>,
}

/// One item version with everything its fields point at
#[derive(Debug, Clone)]
pub struct ResolvedItem {
    pub item: Version<Item>,
    pub assets: HashMap<AssetId, Asset>,
    /// Current (non-tombstoned) versions of directly referenced items;
    /// resolution is one level deep, references of references stay ids
    pub referenced: HashMap<ItemId, Item>,
    pub metadata: Option<MetadataView>,
}

/// A metadata item together with its schema
#[derive(Debug, Clone)]
pub struct MetadataView {
    pub item: Item,
    pub schema: Schema,
}

/// Service projecting item pages into resolved views
pub struct ResolverService {
    items: Arc<ItemRepository>,
    schemas: Arc<SchemaRepository>,
    assets: Arc<AssetRepository>,
}

impl ResolverService {
    /// Create a new resolver service
    pub fn new(
        items: Arc<ItemRepository>,
        schemas: Arc<SchemaRepository>,
        assets: Arc<AssetRepository>,
    ) -> Self {
        Self {
            items,
            schemas,
            assets,
        }
    }

    /// Resolve a batch of item versions in four batched lookups: assets,
    /// referenced items, metadata items with their schemas, and group
    /// schemas.
    pub async fn resolve(&self, versions: Vec<Version<Item>>) -> Result<ResolvedView> {
        let present: Vec<&Item> = versions.iter().filter_map(Version::value).collect();

        let asset_ids = collect_unique(present.iter().flat_map(|i| i.asset_ids()));
        let reference_ids = collect_unique(present.iter().flat_map(|i| i.referenced_item_ids()));
        let metadata_ids = collect_unique(present.iter().filter_map(|i| i.metadata_item()));
        let schema_ids = collect_unique(present.iter().map(|i| i.schema()));

        debug!(
            "Resolving {} items: {} assets, {} references, {} metadata links",
            present.len(),
            asset_ids.len(),
            reference_ids.len(),
            metadata_ids.len()
        );

        let assets = self.assets.find_by_ids(&asset_ids).await?;

        let referenced: HashMap<ItemId, Item> = self
            .items
            .find_by_ids(&reference_ids, &Ref::Latest)
            .await?
            .into_iter()
            .filter_map(|(id, v)| v.into_value().map(|item| (id, item)))
            .collect();

        let metadata_items: HashMap<ItemId, Item> = self
            .items
            .find_by_ids(&metadata_ids, &Ref::Latest)
            .await?
            .into_iter()
            .filter_map(|(id, v)| v.into_value().map(|item| (id, item)))
            .collect();
        let metadata_schema_ids =
            collect_unique(metadata_items.values().map(|i| i.schema()));
        let metadata_schemas = self.schemas.find_by_ids(&metadata_schema_ids).await?;

        let item_schemas = self.schemas.find_by_ids(&schema_ids).await?;
        let group_schema_ids = collect_unique(
            item_schemas
                .values()
                .flat_map(|s| s.fields())
                .filter_map(|f| match f.type_property() {
                    TypeProperty::Group { group_schema } => Some(*group_schema),
                    _ => None,
                }),
        );
        let group_schemas = self.schemas.find_by_ids(&group_schema_ids).await?;

        let items = versions
            .into_iter()
            .map(|version| {
                let (assets, referenced, metadata) = match version.value() {
                    Some(item) => {
                        let own_assets = item
                            .asset_ids()
                            .into_iter()
                            .filter_map(|id| assets.get(&id).map(|a| (id, a.clone())))
                            .collect();
                        let own_refs = item
                            .referenced_item_ids()
                            .into_iter()
                            .filter_map(|id| referenced.get(&id).map(|i| (id, i.clone())))
                            .collect();
                        let metadata = item.metadata_item().and_then(|id| {
                            let meta = metadata_items.get(&id)?;
                            let schema = metadata_schemas.get(&meta.schema())?;
                            Some(MetadataView {
                                item: meta.clone(),
                                schema: schema.clone(),
                            })
                        });
                        (own_assets, own_refs, metadata)
                    }
                    None => (HashMap::new(), HashMap::new(), None),
                };
                ResolvedItem {
                    item: version,
                    assets,
                    referenced,
                    metadata,
                }
            })
            .collect();

        Ok(ResolvedView {
            items,
            group_schemas,
        })
    }
}

fn collect_unique<I, T>(iter: I) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    T: std::hash::Hash + Eq + Copy,
{
    let mut seen = std::collections::HashSet::new();
    iter.into_iter().filter(|id| seen.insert(*id)).collect()
}
