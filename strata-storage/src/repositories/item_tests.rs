/// Tests for the item version repository
#[cfg(test)]
mod tests {
    use crate::repositories::ItemRepository;
    use crate::Error;
    use serde_json::json;
    use sqlx::SqlitePool;
    use strata_core::id::{ModelId, ProjectId, WorkspaceId};
    use strata_core::item::{CreateItemParam, Item, ItemField, ItemFieldParam, UpdateItemParam};
    use strata_core::operator::Operator;
    use strata_core::pagination::{Pagination, Sort};
    use strata_core::schema::{CreateFieldParam, Schema, TypeProperty};
    use strata_core::value::Value;
    use strata_core::version::{Ref, Version};
    use tempfile::NamedTempFile;

    async fn setup_test_db() -> (ItemRepository, NamedTempFile) {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let database_url = format!("sqlite://{}", temp_file.path().display());

        let pool = SqlitePool::connect(&database_url)
            .await
            .expect("Failed to connect to test database");
        crate::migrations::run(&pool)
            .await
            .expect("Failed to run migrations");

        (ItemRepository::new(pool), temp_file)
    }

    fn test_schema() -> Schema {
        let mut schema = Schema::new(ProjectId::new(), WorkspaceId::new());
        schema
            .create_field(CreateFieldParam {
                name: "Title".into(),
                key: "title".into(),
                description: None,
                type_property: TypeProperty::Text { max_length: None },
                required: true,
                unique: false,
                multiple: false,
                is_title: true,
            })
            .expect("Failed to create field");
        schema
    }

    fn test_item(schema: &Schema, model: ModelId, title: &str) -> Item {
        Item::new(
            CreateItemParam {
                schema: schema.id(),
                model,
                metadata_item: None,
                original_item: None,
                is_metadata: false,
                fields: vec![ItemFieldParam {
                    field: None,
                    key: Some("title".into()),
                    value: json!(title),
                }],
            },
            schema,
            &Operator::Machine,
        )
        .expect("Failed to create item")
    }

    fn title_of(item: &Item, schema: &Schema) -> Option<String> {
        let field = schema.field_by_key("title")?;
        item.field(field.id())
            .and_then(ItemField::first)
            .and_then(Value::as_text)
            .map(ToString::to_string)
    }

    #[tokio::test]
    async fn test_version_history_round_trip() {
        let (repo, _temp) = setup_test_db().await;
        let schema = test_schema();
        let item = test_item(&schema, ModelId::new(), "hello");
        let item_id = item.id();

        let v1 = Version::initial(item.clone());
        repo.save_version(item_id, &v1).await.expect("save v1");
        repo.move_ref(item_id, &Ref::Latest, v1.version(), None)
            .await
            .expect("attach latest");

        let updated = item
            .apply_update(
                UpdateItemParam {
                    fields: vec![ItemFieldParam {
                        field: None,
                        key: Some("title".into()),
                        value: json!("world"),
                    }],
                    metadata_item: None,
                },
                &schema,
                &Operator::Machine,
            )
            .expect("apply update");
        let v2 = Version::child(updated, v1.version());
        repo.save_version(item_id, &v2).await.expect("save v2");
        repo.move_ref(item_id, &Ref::Latest, v2.version(), Some(v1.version()))
            .await
            .expect("move latest");

        let history = repo
            .find_versions_by_id(item_id)
            .await
            .expect("load history");
        assert_eq!(history.len(), 2);

        let latest = history.latest().expect("latest present");
        assert_eq!(latest.version(), v2.version());
        assert_eq!(
            latest.value().and_then(|i| title_of(i, &schema)),
            Some("world".into())
        );
        assert!(latest.parents().contains(&v1.version()));

        // the old version stays reachable by id with its original value
        let old = history.version(v1.version()).expect("v1 present");
        assert_eq!(
            old.value().and_then(|i| title_of(i, &schema)),
            Some("hello".into())
        );
        assert!(!old.has_ref(&Ref::Latest));
    }

    #[tokio::test]
    async fn test_move_ref_conflict() {
        let (repo, _temp) = setup_test_db().await;
        let schema = test_schema();
        let item = test_item(&schema, ModelId::new(), "base");
        let item_id = item.id();

        let v1 = Version::initial(item.clone());
        repo.save_version(item_id, &v1).await.expect("save v1");
        repo.move_ref(item_id, &Ref::Latest, v1.version(), None)
            .await
            .expect("attach latest");

        // two writers race from the same observed head
        let v2 = Version::child(item.clone(), v1.version());
        let v3 = Version::child(item, v1.version());
        repo.save_version(item_id, &v2).await.expect("save v2");
        repo.save_version(item_id, &v3).await.expect("save v3");

        repo.move_ref(item_id, &Ref::Latest, v2.version(), Some(v1.version()))
            .await
            .expect("first move wins");
        let err = repo
            .move_ref(item_id, &Ref::Latest, v3.version(), Some(v1.version()))
            .await
            .expect_err("second move must lose");
        assert!(matches!(err, Error::Conflict(_)));

        // attaching an already-attached ref with no expectation also fails
        let err = repo
            .move_ref(item_id, &Ref::Latest, v3.version(), None)
            .await
            .expect_err("blind attach must fail");
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_find_by_ref_and_version() {
        let (repo, _temp) = setup_test_db().await;
        let schema = test_schema();
        let item = test_item(&schema, ModelId::new(), "only");
        let item_id = item.id();

        let v1 = Version::initial(item);
        repo.save_version(item_id, &v1).await.expect("save");
        repo.move_ref(item_id, &Ref::Latest, v1.version(), None)
            .await
            .expect("attach");

        let by_ref = repo
            .find_by_ref(item_id, &Ref::Latest)
            .await
            .expect("query")
            .expect("found");
        assert_eq!(by_ref.version(), v1.version());
        assert!(by_ref.has_ref(&Ref::Latest));

        let by_version = repo
            .find_by_version(item_id, v1.version())
            .await
            .expect("query")
            .expect("found");
        assert_eq!(by_version.version(), v1.version());

        assert!(repo
            .find_by_ref(item_id, &Ref::Public)
            .await
            .expect("query")
            .is_none());
        assert!(repo
            .find_by_ref(strata_core::id::ItemId::new(), &Ref::Latest)
            .await
            .expect("query")
            .is_none());
    }

    #[tokio::test]
    async fn test_remove_ref() {
        let (repo, _temp) = setup_test_db().await;
        let schema = test_schema();
        let item = test_item(&schema, ModelId::new(), "pub");
        let item_id = item.id();

        let v1 = Version::initial(item);
        repo.save_version(item_id, &v1).await.expect("save");
        repo.move_ref(item_id, &Ref::Latest, v1.version(), None)
            .await
            .expect("attach latest");

        // detaching a ref that was never attached is a not-found
        let err = repo
            .remove_ref(item_id, &Ref::Public)
            .await
            .expect_err("nothing to detach");
        assert!(err.is_not_found());

        repo.move_ref(item_id, &Ref::Public, v1.version(), None)
            .await
            .expect("attach public");
        repo.remove_ref(item_id, &Ref::Public)
            .await
            .expect("detach public");
        assert!(repo
            .find_by_ref(item_id, &Ref::Public)
            .await
            .expect("query")
            .is_none());
    }

    #[tokio::test]
    async fn test_find_by_ids_skips_missing() {
        let (repo, _temp) = setup_test_db().await;
        let schema = test_schema();
        let model = ModelId::new();

        let a = test_item(&schema, model, "a");
        let a_id = a.id();
        let va = Version::initial(a);
        repo.save_version(a_id, &va).await.expect("save");
        repo.move_ref(a_id, &Ref::Latest, va.version(), None)
            .await
            .expect("attach");

        let missing = strata_core::id::ItemId::new();
        let found = repo
            .find_by_ids(&[a_id, missing], &Ref::Latest)
            .await
            .expect("batch query");
        assert_eq!(found.len(), 1);
        assert!(!found.contains_key(&missing));

        // the batched path must return the same version, refs included,
        // as the single-item lookup
        let batched = found.get(&a_id).expect("present");
        assert_eq!(batched.version(), va.version());
        assert!(batched.has_ref(&Ref::Latest));
    }

    #[tokio::test]
    async fn test_list_by_model_pagination() {
        let (repo, _temp) = setup_test_db().await;
        let schema = test_schema();
        let model = ModelId::new();

        for n in 0..3 {
            let item = test_item(&schema, model, &format!("item-{n}"));
            let item_id = item.id();
            let v = Version::initial(item);
            repo.save_version(item_id, &v).await.expect("save");
            repo.move_ref(item_id, &Ref::Latest, v.version(), None)
                .await
                .expect("attach");
        }
        // another model's item must not leak into the page
        let stray = test_item(&schema, ModelId::new(), "stray");
        let stray_id = stray.id();
        let v = Version::initial(stray);
        repo.save_version(stray_id, &v).await.expect("save");
        repo.move_ref(stray_id, &Ref::Latest, v.version(), None)
            .await
            .expect("attach");

        let page = repo
            .list_by_model(model, &Ref::Latest, Pagination::from_page(Some(1), Some(2)), &Sort::default())
            .await
            .expect("page 1");
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert!(page.items.iter().all(|v| v.has_ref(&Ref::Latest)));

        let page2 = repo
            .list_by_model(model, &Ref::Latest, Pagination::from_page(Some(2), Some(2)), &Sort::default())
            .await
            .expect("page 2");
        assert_eq!(page2.items.len(), 1);

        // reverted sort flips the order
        let reverted = Sort {
            key: "createdAt".into(),
            reverted: true,
        };
        let newest_first = repo
            .list_by_model(model, &Ref::Latest, Pagination::from_page(Some(1), Some(3)), &reverted)
            .await
            .expect("reverted page");
        let oldest_first = repo
            .list_by_model(model, &Ref::Latest, Pagination::from_page(Some(1), Some(3)), &Sort::default())
            .await
            .expect("ascending page");
        assert_eq!(
            newest_first.items.first().map(Version::version),
            oldest_first.items.last().map(Version::version)
        );

        // sort keys outside the whitelist are rejected up front
        let bogus = Sort {
            key: "fields.title".into(),
            reverted: false,
        };
        let err = repo
            .list_by_model(model, &Ref::Latest, Pagination::default(), &bogus)
            .await
            .expect_err("unknown sort key");
        assert!(matches!(err, Error::Core(e) if e.is_validation()));
    }

    #[tokio::test]
    async fn test_count_distinct_items() {
        let (repo, _temp) = setup_test_db().await;
        let schema = test_schema();
        let item = test_item(&schema, ModelId::new(), "counted");
        let item_id = item.id();

        let v1 = Version::initial(item.clone());
        repo.save_version(item_id, &v1).await.expect("save v1");
        let v2 = Version::child(item, v1.version());
        repo.save_version(item_id, &v2).await.expect("save v2");

        // two versions, one logical item
        assert_eq!(repo.count().await.expect("count"), 1);
    }
}
