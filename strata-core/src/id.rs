//! Typed identifiers for domain entities
//!
//! Every aggregate gets its own UUID newtype so that an item id cannot be
//! passed where a schema id is expected. Cross-item links (references,
//! metadata items, assets) are stored as plain ids and resolved explicitly;
//! entities never embed live object graphs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Access the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

entity_id!(
    /// Identifier of a content item
    ItemId
);
entity_id!(
    /// Identifier of a schema field
    FieldId
);
entity_id!(
    /// Identifier of a schema
    SchemaId
);
entity_id!(
    /// Identifier of a model (content type)
    ModelId
);
entity_id!(
    /// Identifier of a project
    ProjectId
);
entity_id!(
    /// Identifier of a workspace
    WorkspaceId
);
entity_id!(
    /// Identifier of an asset
    AssetId
);
entity_id!(
    /// Identifier of a single item version
    VersionId
);
entity_id!(
    /// Identifier of a comment thread attached to an item
    ThreadId
);
entity_id!(
    /// Identifier of a user
    UserId
);
entity_id!(
    /// Identifier of an integration
    IntegrationId
);
entity_id!(
    /// Identifier of a nested group instance inside an item
    ItemGroupId
);
