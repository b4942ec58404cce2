//! Item field collections

use crate::id::FieldId;
use crate::value::{Multiple, Value, ValueType};
use serde::{Deserialize, Serialize};

/// One stored field value of an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemField {
    field: FieldId,
    value: Multiple,
}

impl ItemField {
    pub fn new(field: FieldId, value: Multiple) -> Self {
        Self { field, value }
    }

    pub fn field(&self) -> FieldId {
        self.field
    }

    pub fn value(&self) -> &Multiple {
        &self.value
    }

    /// The head value; single-valued fields store a sequence of length <= 1
    pub fn first(&self) -> Option<&Value> {
        self.value.first()
    }
}

/// Ordered field values keyed by field id, at most one entry per field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fields(Vec<ItemField>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the value stored for a field
    pub fn field(&self, id: FieldId) -> Option<&ItemField> {
        self.0.iter().find(|f| f.field() == id)
    }

    /// Insert or replace the value for a field
    pub fn set(&mut self, field: ItemField) {
        if let Some(existing) = self.0.iter_mut().find(|f| f.field() == field.field()) {
            *existing = field;
        } else {
            self.0.push(field);
        }
    }

    /// All entries whose values carry the given type tag. Used by the
    /// asset/reference/geometry resolvers to find fields needing special
    /// handling without schema lookups.
    pub fn fields_by_type(&self, value_type: ValueType) -> Vec<&ItemField> {
        self.0
            .iter()
            .filter(|f| f.value().value_type() == value_type)
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ItemField> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
