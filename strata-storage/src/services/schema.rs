//! Schema service
//!
//! Field mutations on one schema are serialized through a per-schema async
//! mutex so concurrent create/update/delete calls cannot interleave their
//! read-modify-write cycles and lose a key-uniqueness check.

use crate::repositories::SchemaRepository;
use crate::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;
use strata_core::id::{FieldId, ProjectId, SchemaId, WorkspaceId};
use strata_core::schema::{CreateFieldParam, Field, Schema, UpdateFieldParam};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Service for schema and field management
pub struct SchemaService {
    schemas: Arc<SchemaRepository>,
    locks: DashMap<SchemaId, Arc<Mutex<()>>>,
}

impl SchemaService {
    /// Create a new schema service
    pub fn new(schemas: Arc<SchemaRepository>) -> Self {
        Self {
            schemas,
            locks: DashMap::new(),
        }
    }

    /// Create and persist an empty schema
    pub async fn create(&self, project: ProjectId, workspace: WorkspaceId) -> Result<Schema> {
        let schema = Schema::new(project, workspace);
        self.schemas.save(&schema).await?;
        info!("Created schema {} for project {}", schema.id(), project);
        Ok(schema)
    }

    /// Load a schema
    pub async fn find(&self, id: SchemaId) -> Result<Schema> {
        self.schemas
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Schema", id.to_string()))
    }

    /// Add a field to a schema
    pub async fn create_field(&self, id: SchemaId, param: CreateFieldParam) -> Result<Field> {
        let _guard = self.lock(id).await;
        let mut schema = self.find(id).await?;
        let field = schema.create_field(param)?.clone();
        self.schemas.save(&schema).await?;
        debug!("Added field '{}' to schema {}", field.key(), id);
        Ok(field)
    }

    /// Update a field of a schema
    pub async fn update_field(
        &self,
        id: SchemaId,
        field_id: FieldId,
        param: UpdateFieldParam,
    ) -> Result<Field> {
        let _guard = self.lock(id).await;
        let mut schema = self.find(id).await?;
        let field = schema.update_field(field_id, param)?.clone();
        self.schemas.save(&schema).await?;
        debug!("Updated field '{}' of schema {}", field.key(), id);
        Ok(field)
    }

    /// Remove a field declaration from a schema. Values stored in historical
    /// item versions stay untouched.
    pub async fn delete_field(&self, id: SchemaId, field_id: FieldId) -> Result<()> {
        let _guard = self.lock(id).await;
        let mut schema = self.find(id).await?;
        schema.delete_field(field_id)?;
        self.schemas.save(&schema).await?;
        debug!("Removed field {} from schema {}", field_id, id);
        Ok(())
    }

    /// Delete a schema entirely
    pub async fn delete(&self, id: SchemaId) -> Result<()> {
        let _guard = self.lock(id).await;
        self.schemas.delete(id).await?;
        self.locks.remove(&id);
        info!("Deleted schema {}", id);
        Ok(())
    }

    async fn lock(&self, id: SchemaId) -> tokio::sync::OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}
