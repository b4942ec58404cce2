//! User-authored schemas
//!
//! A schema owns an ordered list of fields with unique ids and unique keys.
//! Field mutation goes through [`Schema::create_field`] /
//! [`Schema::update_field`] / [`Schema::delete_field`] so key-uniqueness and
//! type-consistency checks always see the full field list. Callers that
//! persist schemas must serialize field mutations per schema (see the
//! storage crate's schema service).

pub mod field;
pub mod type_property;

pub use field::{Field, FieldBuilder};
pub use type_property::TypeProperty;

use crate::id::{FieldId, ProjectId, SchemaId, WorkspaceId};
use crate::value::ValueType;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// An ordered set of field declarations belonging to one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    id: SchemaId,
    project: ProjectId,
    workspace: WorkspaceId,
    fields: Vec<Field>,
    title_field: Option<FieldId>,
}

/// Parameters for creating a schema field
#[derive(Debug, Clone)]
pub struct CreateFieldParam {
    pub name: String,
    pub key: String,
    pub description: Option<String>,
    pub type_property: TypeProperty,
    pub required: bool,
    pub unique: bool,
    pub multiple: bool,
    pub is_title: bool,
}

/// Parameters for updating a schema field; unset members are preserved
#[derive(Debug, Clone, Default)]
pub struct UpdateFieldParam {
    pub name: Option<String>,
    pub key: Option<String>,
    pub description: Option<String>,
    pub type_property: Option<TypeProperty>,
    pub required: Option<bool>,
    pub unique: Option<bool>,
    pub multiple: Option<bool>,
    pub is_title: Option<bool>,
}

impl Schema {
    /// Create an empty schema
    pub fn new(project: ProjectId, workspace: WorkspaceId) -> Self {
        Self {
            id: SchemaId::new(),
            project,
            workspace,
            fields: Vec::new(),
            title_field: None,
        }
    }

    pub fn id(&self) -> SchemaId {
        self.id
    }

    pub fn project(&self) -> ProjectId {
        self.project
    }

    pub fn workspace(&self) -> WorkspaceId {
        self.workspace
    }

    /// All fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The field flagged as the item title, if any
    pub fn title_field(&self) -> Option<FieldId> {
        self.title_field
    }

    /// Look up a field by id
    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.fields.iter().find(|f| f.id() == id)
    }

    /// Look up a field by key
    pub fn field_by_key(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key() == key)
    }

    /// Look up a field by either identifier. External callers may address
    /// fields by human-readable key or internal id.
    pub fn field_by_id_or_key(&self, id: Option<FieldId>, key: Option<&str>) -> Option<&Field> {
        if let Some(id) = id {
            if let Some(field) = self.field(id) {
                return Some(field);
            }
        }
        key.and_then(|k| self.field_by_key(k))
    }

    /// All fields storing the given value type
    pub fn fields_by_type(&self, value_type: ValueType) -> Vec<&Field> {
        self.fields
            .iter()
            .filter(|f| f.value_type() == value_type)
            .collect()
    }

    /// Whether any field stores a geometry value. Geo exporters reject
    /// schemas where this is false.
    pub fn has_geometry_field(&self) -> bool {
        self.fields.iter().any(|f| {
            matches!(
                f.value_type(),
                ValueType::GeometryObject | ValueType::GeometryEditor
            )
        })
    }

    /// Add a field, enforcing key uniqueness and type-property consistency
    pub fn create_field(&mut self, param: CreateFieldParam) -> Result<&Field> {
        if self.field_by_key(&param.key).is_some() {
            return Err(Error::key_conflict(param.key));
        }
        let mut builder = Field::builder()
            .name(param.name)
            .key(param.key)
            .type_property(param.type_property)
            .required(param.required)
            .unique(param.unique)
            .multiple(param.multiple);
        if let Some(description) = param.description {
            builder = builder.description(description);
        }
        let field = builder.build()?;
        let id = field.id();
        let index = self.fields.len();
        self.fields.push(field);
        if param.is_title {
            // reassigning moves the flag; at most one field holds it
            self.title_field = Some(id);
        }
        Ok(&self.fields[index])
    }

    /// Update a field in place, preserving unset parameters
    pub fn update_field(&mut self, id: FieldId, param: UpdateFieldParam) -> Result<&Field> {
        if let Some(key) = &param.key {
            if self.fields.iter().any(|f| f.key() == key && f.id() != id) {
                return Err(Error::key_conflict(key.clone()));
            }
        }
        let index = self
            .fields
            .iter()
            .position(|f| f.id() == id)
            .ok_or_else(|| Error::not_found("Field", id.to_string()))?;
        let field = &mut self.fields[index];
        if let Some(name) = param.name {
            field.set_name(name)?;
        }
        if let Some(key) = param.key {
            field.set_key(key)?;
        }
        if let Some(description) = param.description {
            field.set_description(description);
        }
        if let Some(type_property) = param.type_property {
            field.set_type_property(type_property)?;
        }
        if let Some(required) = param.required {
            field.set_required(required);
        }
        if let Some(unique) = param.unique {
            field.set_unique(unique);
        }
        if let Some(multiple) = param.multiple {
            field.set_multiple(multiple)?;
        }
        match param.is_title {
            Some(true) => self.title_field = Some(id),
            Some(false) if self.title_field == Some(id) => self.title_field = None,
            _ => {}
        }
        Ok(&self.fields[index])
    }

    /// Remove a field declaration. Values stored in historical item versions
    /// are never erased; only the declaration is retired.
    pub fn delete_field(&mut self, id: FieldId) -> Result<()> {
        let index = self
            .fields
            .iter()
            .position(|f| f.id() == id)
            .ok_or_else(|| Error::not_found("Field", id.to_string()))?;
        self.fields.remove(index);
        if self.title_field == Some(id) {
            self.title_field = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_param(key: &str) -> CreateFieldParam {
        CreateFieldParam {
            name: key.to_string(),
            key: key.to_string(),
            description: None,
            type_property: TypeProperty::Text {
                max_length: Some(100),
            },
            required: false,
            unique: false,
            multiple: false,
            is_title: false,
        }
    }

    fn new_schema() -> Schema {
        Schema::new(ProjectId::new(), WorkspaceId::new())
    }

    #[test]
    fn test_create_field_and_lookup() {
        let mut schema = new_schema();
        let id = schema.create_field(text_param("title")).unwrap().id();

        assert_eq!(schema.field(id).unwrap().key(), "title");
        assert_eq!(schema.field_by_key("title").unwrap().id(), id);
        assert!(schema.field_by_key("missing").is_none());
        assert_eq!(
            schema.field_by_id_or_key(None, Some("title")).unwrap().id(),
            id
        );
        assert_eq!(
            schema.field_by_id_or_key(Some(id), None).unwrap().id(),
            id
        );
    }

    #[test]
    fn test_key_conflict() {
        let mut schema = new_schema();
        schema.create_field(text_param("slug")).unwrap();
        let err = schema.create_field(text_param("slug")).unwrap_err();
        assert!(err.is_key_conflict());

        // same key in a different schema is fine
        let mut other = new_schema();
        assert!(other.create_field(text_param("slug")).is_ok());
    }

    #[test]
    fn test_update_field_key_conflict() {
        let mut schema = new_schema();
        schema.create_field(text_param("one")).unwrap();
        let id = schema.create_field(text_param("two")).unwrap().id();

        let err = schema
            .update_field(
                id,
                UpdateFieldParam {
                    key: Some("one".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.is_key_conflict());

        // renaming to its own key is allowed
        assert!(schema
            .update_field(
                id,
                UpdateFieldParam {
                    key: Some("two".into()),
                    ..Default::default()
                },
            )
            .is_ok());
    }

    #[test]
    fn test_title_flag_single_holder() {
        let mut schema = new_schema();
        let mut param = text_param("name");
        param.is_title = true;
        let first = schema.create_field(param).unwrap().id();
        assert_eq!(schema.title_field(), Some(first));

        let mut param = text_param("headline");
        param.is_title = true;
        let second = schema.create_field(param).unwrap().id();
        assert_eq!(schema.title_field(), Some(second));
    }

    #[test]
    fn test_delete_field() {
        let mut schema = new_schema();
        let mut param = text_param("name");
        param.is_title = true;
        let id = schema.create_field(param).unwrap().id();

        schema.delete_field(id).unwrap();
        assert!(schema.field(id).is_none());
        assert_eq!(schema.title_field(), None);
        assert!(schema.delete_field(id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_fields_by_type_and_geometry_probe() {
        let mut schema = new_schema();
        schema.create_field(text_param("title")).unwrap();
        assert!(!schema.has_geometry_field());

        let param = CreateFieldParam {
            name: "Location".into(),
            key: "location".into(),
            description: None,
            type_property: TypeProperty::GeometryObject {
                supported: vec![crate::value::GeometryType::Point],
            },
            required: false,
            unique: false,
            multiple: false,
            is_title: false,
        };
        schema.create_field(param).unwrap();
        assert!(schema.has_geometry_field());
        assert_eq!(schema.fields_by_type(ValueType::Text).len(), 1);
        assert_eq!(schema.fields_by_type(ValueType::GeometryObject).len(), 1);
    }
}
