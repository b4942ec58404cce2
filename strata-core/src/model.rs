//! Content models
//!
//! A model is a named content type binding one primary schema and optionally
//! a metadata schema within a project.

use crate::id::{ModelId, ProjectId, SchemaId};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A named content type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    id: ModelId,
    project: ProjectId,
    name: String,
    key: String,
    schema: SchemaId,
    metadata_schema: Option<SchemaId>,
}

impl Model {
    /// Create a new model with validation
    pub fn new(project: ProjectId, name: String, key: String, schema: SchemaId) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(Error::validation("Model name cannot be empty"));
        }
        if key.trim().is_empty() {
            return Err(Error::validation("Model key cannot be empty"));
        }
        Ok(Self {
            id: ModelId::new(),
            project,
            name,
            key,
            schema,
            metadata_schema: None,
        })
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn project(&self) -> ProjectId {
        self.project
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn schema(&self) -> SchemaId {
        self.schema
    }

    pub fn metadata_schema(&self) -> Option<SchemaId> {
        self.metadata_schema
    }

    /// Attach a metadata schema
    pub fn set_metadata_schema(&mut self, schema: Option<SchemaId>) {
        self.metadata_schema = schema;
    }
}
