//! Content items
//!
//! An item is a concrete content record: field values keyed by schema field,
//! plus structural links (owning model and schema, optional metadata item,
//! optional original-item backlink for metadata records). Items never embed
//! referenced items or assets; those stay weak id references resolved by the
//! storage crate's resolver.

pub mod fields;

pub use fields::{Fields, ItemField};

use crate::id::{AssetId, FieldId, ItemGroupId, ItemId, ModelId, SchemaId, ThreadId};
use crate::operator::Operator;
use crate::schema::Schema;
use crate::value::{Multiple, Value, ValueType};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// A single content record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    schema: SchemaId,
    model: ModelId,
    fields: Fields,
    metadata_item: Option<ItemId>,
    original_item: Option<ItemId>,
    is_metadata: bool,
    thread: Option<ThreadId>,
    created_by: Option<Operator>,
    updated_by: Option<Operator>,
    timestamp: DateTime<Utc>,
}

/// Raw input for one field of an item, addressed by id or key
#[derive(Debug, Clone)]
pub struct ItemFieldParam {
    pub field: Option<FieldId>,
    pub key: Option<String>,
    pub value: Json,
}

/// Parameters for creating an item
#[derive(Debug, Clone)]
pub struct CreateItemParam {
    pub schema: SchemaId,
    pub model: ModelId,
    pub metadata_item: Option<ItemId>,
    pub original_item: Option<ItemId>,
    pub is_metadata: bool,
    pub fields: Vec<ItemFieldParam>,
}

/// Parameters for updating an item; fields not mentioned are preserved
#[derive(Debug, Clone)]
pub struct UpdateItemParam {
    pub fields: Vec<ItemFieldParam>,
    pub metadata_item: Option<ItemId>,
}

impl Item {
    /// Build a new item from raw field inputs, validating every value
    /// against the schema. Unknown field ids, coercion failures, and missing
    /// required fields are rejected before any state exists.
    pub fn new(param: CreateItemParam, schema: &Schema, operator: &Operator) -> Result<Self> {
        if param.schema != schema.id() {
            return Err(Error::validation("item schema does not match"));
        }
        let fields = validate_fields(&param.fields, schema, true)?;
        Ok(Self {
            id: ItemId::new(),
            schema: param.schema,
            model: param.model,
            fields,
            metadata_item: param.metadata_item,
            original_item: param.original_item,
            is_metadata: param.is_metadata,
            thread: None,
            created_by: operator.attribution(),
            updated_by: None,
            timestamp: Utc::now(),
        })
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn schema(&self) -> SchemaId {
        self.schema
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Look up the stored value for a field
    pub fn field(&self, id: FieldId) -> Option<&ItemField> {
        self.fields.field(id)
    }

    pub fn metadata_item(&self) -> Option<ItemId> {
        self.metadata_item
    }

    pub fn original_item(&self) -> Option<ItemId> {
        self.original_item
    }

    /// Whether this item is a metadata record attached to another item
    pub fn is_metadata(&self) -> bool {
        self.is_metadata
    }

    pub fn thread(&self) -> Option<ThreadId> {
        self.thread
    }

    pub fn set_thread(&mut self, thread: Option<ThreadId>) {
        self.thread = thread;
    }

    pub fn created_by(&self) -> Option<&Operator> {
        self.created_by.as_ref()
    }

    pub fn updated_by(&self) -> Option<&Operator> {
        self.updated_by.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Asset ids referenced by asset-typed field values
    pub fn asset_ids(&self) -> Vec<AssetId> {
        self.fields
            .fields_by_type(ValueType::Asset)
            .into_iter()
            .flat_map(|f| f.value().iter())
            .filter_map(Value::as_asset)
            .collect()
    }

    /// Item ids referenced by reference-typed field values
    pub fn referenced_item_ids(&self) -> Vec<ItemId> {
        self.fields
            .fields_by_type(ValueType::Reference)
            .into_iter()
            .flat_map(|f| f.value().iter())
            .filter_map(Value::as_reference)
            .collect()
    }

    /// Group instance ids carried by group-typed field values
    pub fn group_ids(&self) -> Vec<ItemGroupId> {
        self.fields
            .fields_by_type(ValueType::Group)
            .into_iter()
            .flat_map(|f| f.value().iter())
            .filter_map(Value::as_group)
            .collect()
    }

    /// Produce an updated copy of this item, replacing the value of each
    /// named field and preserving fields not mentioned. The old item is
    /// never mutated; the caller wraps the result in a new version.
    pub fn apply_update(
        &self,
        param: UpdateItemParam,
        schema: &Schema,
        operator: &Operator,
    ) -> Result<Self> {
        let updates = validate_fields(&param.fields, schema, false)?;
        let mut next = self.clone();
        for field in updates.iter() {
            next.fields.set(field.clone());
        }
        if let Some(metadata_item) = param.metadata_item {
            next.metadata_item = Some(metadata_item);
        }
        next.updated_by = operator.attribution();
        next.timestamp = Utc::now();
        Ok(next)
    }
}

/// Validate raw field inputs against a schema. With `check_required`, every
/// required schema field must be supplied with a non-empty value.
fn validate_fields(
    params: &[ItemFieldParam],
    schema: &Schema,
    check_required: bool,
) -> Result<Fields> {
    let mut fields = Fields::new();
    for param in params {
        let field = schema
            .field_by_id_or_key(param.field, param.key.as_deref())
            .ok_or_else(|| {
                Error::validation(format!(
                    "unknown field '{}'",
                    param
                        .field
                        .map(|id| id.to_string())
                        .or_else(|| param.key.clone())
                        .unwrap_or_default()
                ))
            })?;
        if fields.field(field.id()).is_some() {
            return Err(Error::validation(format!(
                "field '{}' supplied more than once",
                field.key()
            )));
        }
        let value = Multiple::try_from_json(field.value_type(), &param.value)?;
        field.validate_value(&value)?;
        fields.set(ItemField::new(field.id(), value));
    }
    if check_required {
        for field in schema.fields() {
            if field.required() && fields.field(field.id()).is_none() {
                return Err(Error::validation(format!(
                    "field '{}' is required",
                    field.key()
                )));
            }
        }
    }
    Ok(fields)
}
