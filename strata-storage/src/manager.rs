//! Storage manager wiring the pool, repositories and services together

use crate::repositories::{AssetRepository, ItemRepository, ModelRepository, SchemaRepository};
use crate::services::{ItemService, ResolverService, SchemaService};
use crate::{migrations, Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::{debug, info};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub migrate_on_startup: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:./strata.db".to_string(),
            max_connections: 10,
            migrate_on_startup: true,
        }
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub item_count: i64,
    pub schema_count: i64,
    pub model_count: i64,
    pub asset_count: i64,
}

/// Central storage manager owning the connection pool
pub struct StorageManager {
    pool: Pool<Sqlite>,
    items: Arc<ItemRepository>,
    schemas: Arc<SchemaRepository>,
    models: Arc<ModelRepository>,
    assets: Arc<AssetRepository>,
    item_service: Arc<ItemService>,
    schema_service: Arc<SchemaService>,
    resolver_service: Arc<ResolverService>,
}

impl StorageManager {
    /// Connect to the database and wire up repositories and services
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database: {}", config.url);

        let options = config
            .url
            .parse::<SqliteConnectOptions>()
            .map_err(Error::Database)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(Error::Database)?;

        if config.migrate_on_startup {
            migrations::run(&pool).await?;
        }

        let items = Arc::new(ItemRepository::new(pool.clone()));
        let schemas = Arc::new(SchemaRepository::new(pool.clone()));
        let models = Arc::new(ModelRepository::new(pool.clone()));
        let assets = Arc::new(AssetRepository::new(pool.clone()));

        let item_service = Arc::new(ItemService::new(items.clone(), schemas.clone()));
        let schema_service = Arc::new(SchemaService::new(schemas.clone()));
        let resolver_service = Arc::new(ResolverService::new(
            items.clone(),
            schemas.clone(),
            assets.clone(),
        ));

        Ok(Self {
            pool,
            items,
            schemas,
            models,
            assets,
            item_service,
            schema_service,
            resolver_service,
        })
    }

    /// Apply pending migrations
    pub async fn migrate(&self) -> Result<()> {
        migrations::run(&self.pool).await
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub fn items(&self) -> Arc<ItemRepository> {
        self.items.clone()
    }

    pub fn schemas(&self) -> Arc<SchemaRepository> {
        self.schemas.clone()
    }

    pub fn models(&self) -> Arc<ModelRepository> {
        self.models.clone()
    }

    pub fn assets(&self) -> Arc<AssetRepository> {
        self.assets.clone()
    }

    pub fn item_service(&self) -> Arc<ItemService> {
        self.item_service.clone()
    }

    pub fn schema_service(&self) -> Arc<SchemaService> {
        self.schema_service.clone()
    }

    pub fn resolver_service(&self) -> Arc<ResolverService> {
        self.resolver_service.clone()
    }

    /// Verify database connectivity
    pub async fn health_check(&self) -> Result<()> {
        debug!("Performing database health check");
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Gather row counts across the aggregates
    pub async fn stats(&self) -> Result<DatabaseStats> {
        Ok(DatabaseStats {
            item_count: self.items.count().await?,
            schema_count: self.schemas.count().await?,
            model_count: self.models.count().await?,
            asset_count: self.assets.count().await?,
        })
    }

    /// Close the connection pool
    pub async fn close(&self) {
        info!("Closing database connections");
        self.pool.close().await;
    }
}
