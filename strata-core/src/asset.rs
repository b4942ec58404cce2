//! Asset projection records
//!
//! Binary storage is out of scope; the engine only keeps the slim record
//! needed to project asset-typed field values into a resolved item view.

use crate::id::{AssetId, ProjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata of an uploaded asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub project: ProjectId,
    pub file_name: String,
    pub size: u64,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    /// Create a new asset record
    pub fn new(project: ProjectId, file_name: String, size: u64, url: String) -> Self {
        Self {
            id: AssetId::new(),
            project,
            file_name,
            size,
            url,
            created_at: Utc::now(),
        }
    }
}
