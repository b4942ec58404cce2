/// Tests for the resolver service
#[cfg(test)]
mod tests {
    use crate::repositories::{AssetRepository, ItemRepository, SchemaRepository};
    use crate::services::item::{DeleteOptions, ItemService};
    use crate::services::ResolverService;
    use serde_json::json;
    use sqlx::SqlitePool;
    use std::sync::Arc;
    use strata_core::asset::Asset;
    use strata_core::id::{ModelId, ProjectId, WorkspaceId};
    use strata_core::item::{CreateItemParam, ItemFieldParam};
    use strata_core::operator::Operator;
    use strata_core::schema::{CreateFieldParam, Schema, TypeProperty};
    use tempfile::NamedTempFile;

    struct Fixture {
        items: ItemService,
        resolver: ResolverService,
        schemas: Arc<SchemaRepository>,
        assets: Arc<AssetRepository>,
    }

    async fn setup() -> (Fixture, NamedTempFile) {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let database_url = format!("sqlite://{}", temp_file.path().display());

        let pool = SqlitePool::connect(&database_url)
            .await
            .expect("Failed to connect to test database");
        crate::migrations::run(&pool)
            .await
            .expect("Failed to run migrations");

        let item_repo = Arc::new(ItemRepository::new(pool.clone()));
        let schemas = Arc::new(SchemaRepository::new(pool.clone()));
        let assets = Arc::new(AssetRepository::new(pool));
        let fixture = Fixture {
            items: ItemService::new(item_repo.clone(), schemas.clone()),
            resolver: ResolverService::new(item_repo, schemas.clone(), assets.clone()),
            schemas,
            assets,
        };
        (fixture, temp_file)
    }

    fn title_field() -> CreateFieldParam {
        CreateFieldParam {
            name: "Title".into(),
            key: "title".into(),
            description: None,
            type_property: TypeProperty::Text { max_length: None },
            required: false,
            unique: false,
            multiple: false,
            is_title: true,
        }
    }

    async fn save_schema(fixture: &Fixture, schema: &Schema) {
        fixture
            .schemas
            .save(schema)
            .await
            .expect("Failed to save schema");
    }

    #[tokio::test]
    async fn test_resolve_assets_and_references() {
        let (fixture, _temp) = setup().await;
        let project = ProjectId::new();
        let model = ModelId::new();

        // target item the main item will reference
        let mut target_schema = Schema::new(project, WorkspaceId::new());
        target_schema.create_field(title_field()).expect("field");
        save_schema(&fixture, &target_schema).await;
        let target = fixture
            .items
            .create(
                CreateItemParam {
                    schema: target_schema.id(),
                    model,
                    metadata_item: None,
                    original_item: None,
                    is_metadata: false,
                    fields: vec![ItemFieldParam {
                        field: None,
                        key: Some("title".into()),
                        value: json!("target"),
                    }],
                },
                &Operator::Machine,
            )
            .await
            .expect("create target");
        let target_id = target.value().expect("value").id();

        let asset = Asset::new(project, "cover.png".into(), 2048, "s3://bucket/cover.png".into());
        fixture.assets.save(&asset).await.expect("save asset");

        let mut schema = Schema::new(project, WorkspaceId::new());
        schema
            .create_field(CreateFieldParam {
                name: "Cover".into(),
                key: "cover".into(),
                description: None,
                type_property: TypeProperty::Asset,
                required: false,
                unique: false,
                multiple: false,
                is_title: false,
            })
            .expect("asset field");
        schema
            .create_field(CreateFieldParam {
                name: "Link".into(),
                key: "link".into(),
                description: None,
                type_property: TypeProperty::Reference {
                    model,
                    schema: target_schema.id(),
                    correlation_field: None,
                },
                required: false,
                unique: false,
                multiple: false,
                is_title: false,
            })
            .expect("reference field");
        save_schema(&fixture, &schema).await;

        let version = fixture
            .items
            .create(
                CreateItemParam {
                    schema: schema.id(),
                    model: ModelId::new(),
                    metadata_item: None,
                    original_item: None,
                    is_metadata: false,
                    fields: vec![
                        ItemFieldParam {
                            field: None,
                            key: Some("cover".into()),
                            value: json!(asset.id.to_string()),
                        },
                        ItemFieldParam {
                            field: None,
                            key: Some("link".into()),
                            value: json!(target_id.to_string()),
                        },
                    ],
                },
                &Operator::Machine,
            )
            .await
            .expect("create item");

        let view = fixture
            .resolver
            .resolve(vec![version.clone()])
            .await
            .expect("resolve");
        assert_eq!(view.items.len(), 1);
        let resolved = &view.items[0];
        assert_eq!(resolved.assets.get(&asset.id), Some(&asset));
        assert_eq!(
            resolved.referenced.get(&target_id).map(|i| i.id()),
            Some(target_id)
        );

        // a deleted reference target drops out silently
        fixture
            .items
            .delete(target_id, DeleteOptions::default())
            .await
            .expect("delete target");
        let view = fixture
            .resolver
            .resolve(vec![version])
            .await
            .expect("resolve after delete");
        assert!(view.items[0].referenced.is_empty());
        assert!(view.items[0].assets.contains_key(&asset.id));
    }

    #[tokio::test]
    async fn test_resolve_metadata_and_group_schemas() {
        let (fixture, _temp) = setup().await;
        let project = ProjectId::new();
        let model = ModelId::new();

        let mut meta_schema = Schema::new(project, WorkspaceId::new());
        meta_schema.create_field(title_field()).expect("field");
        save_schema(&fixture, &meta_schema).await;
        let meta = fixture
            .items
            .create(
                CreateItemParam {
                    schema: meta_schema.id(),
                    model,
                    metadata_item: None,
                    original_item: None,
                    is_metadata: true,
                    fields: vec![],
                },
                &Operator::Machine,
            )
            .await
            .expect("create metadata item");
        let meta_id = meta.value().expect("value").id();

        let mut group_schema = Schema::new(project, WorkspaceId::new());
        group_schema.create_field(title_field()).expect("field");
        save_schema(&fixture, &group_schema).await;

        let mut schema = Schema::new(project, WorkspaceId::new());
        schema
            .create_field(CreateFieldParam {
                name: "Sections".into(),
                key: "sections".into(),
                description: None,
                type_property: TypeProperty::Group {
                    group_schema: group_schema.id(),
                },
                required: false,
                unique: false,
                multiple: true,
                is_title: false,
            })
            .expect("group field");
        save_schema(&fixture, &schema).await;

        let version = fixture
            .items
            .create(
                CreateItemParam {
                    schema: schema.id(),
                    model: ModelId::new(),
                    metadata_item: Some(meta_id),
                    original_item: None,
                    is_metadata: false,
                    fields: vec![],
                },
                &Operator::Machine,
            )
            .await
            .expect("create item");

        let view = fixture
            .resolver
            .resolve(vec![version])
            .await
            .expect("resolve");
        let resolved = &view.items[0];
        let metadata = resolved.metadata.as_ref().expect("metadata resolved");
        assert_eq!(metadata.item.id(), meta_id);
        assert!(metadata.item.is_metadata());
        assert_eq!(metadata.schema.id(), meta_schema.id());
        assert!(view.group_schemas.contains_key(&group_schema.id()));
    }

    #[tokio::test]
    async fn test_resolve_empty_batch() {
        let (fixture, _temp) = setup().await;
        let view = fixture.resolver.resolve(vec![]).await.expect("resolve");
        assert!(view.items.is_empty());
        assert!(view.group_schemas.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_dangling_schema_id() {
        let (fixture, _temp) = setup().await;
        let mut schema = Schema::new(ProjectId::new(), WorkspaceId::new());
        schema.create_field(title_field()).expect("field");
        save_schema(&fixture, &schema).await;

        let version = fixture
            .items
            .create(
                CreateItemParam {
                    schema: schema.id(),
                    model: ModelId::new(),
                    metadata_item: None,
                    original_item: None,
                    is_metadata: false,
                    fields: vec![],
                },
                &Operator::Machine,
            )
            .await
            .expect("create item");

        // schema vanishing later must not fail resolution
        fixture
            .schemas
            .delete(schema.id())
            .await
            .expect("delete schema");
        let view = fixture
            .resolver
            .resolve(vec![version])
            .await
            .expect("resolve");
        assert_eq!(view.items.len(), 1);
        assert!(view.items[0].metadata.is_none());
        assert!(view.group_schemas.is_empty());
    }
}
