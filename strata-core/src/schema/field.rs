//! Schema field declarations

use crate::id::FieldId;
use crate::schema::TypeProperty;
use crate::value::{Multiple, ValueType};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A schema-declared slot with a type, multiplicity, and constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    id: FieldId,
    name: String,
    key: String,
    description: String,
    type_property: TypeProperty,
    required: bool,
    unique: bool,
    multiple: bool,
    updated_at: DateTime<Utc>,
}

impl Field {
    /// Create a new field with validation
    pub fn new(name: String, key: String, type_property: TypeProperty) -> Result<Self> {
        validate_name(&name)?;
        validate_key(&key)?;
        type_property.validate()?;
        Ok(Self {
            id: FieldId::new(),
            name,
            key,
            description: String::new(),
            type_property,
            required: false,
            unique: false,
            multiple: false,
            updated_at: Utc::now(),
        })
    }

    /// Create a builder for constructing a Field
    pub fn builder() -> FieldBuilder {
        FieldBuilder::new()
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn type_property(&self) -> &TypeProperty {
        &self.type_property
    }

    /// The value type this field stores
    pub fn value_type(&self) -> ValueType {
        self.type_property.value_type()
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn unique(&self) -> bool {
        self.unique
    }

    pub fn multiple(&self) -> bool {
        self.multiple
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub(crate) fn set_name(&mut self, name: String) -> Result<()> {
        validate_name(&name)?;
        self.name = name;
        self.touch();
        Ok(())
    }

    pub(crate) fn set_key(&mut self, key: String) -> Result<()> {
        validate_key(&key)?;
        self.key = key;
        self.touch();
        Ok(())
    }

    pub(crate) fn set_description(&mut self, description: String) {
        self.description = description;
        self.touch();
    }

    pub(crate) fn set_required(&mut self, required: bool) {
        self.required = required;
        self.touch();
    }

    pub(crate) fn set_unique(&mut self, unique: bool) {
        self.unique = unique;
        self.touch();
    }

    pub(crate) fn set_multiple(&mut self, multiple: bool) -> Result<()> {
        if multiple && !self.type_property.supports_multiple() {
            return Err(Error::not_implemented(format!(
                "multiple-valued {} field",
                self.value_type()
            )));
        }
        self.multiple = multiple;
        self.touch();
        Ok(())
    }

    pub(crate) fn set_type_property(&mut self, type_property: TypeProperty) -> Result<()> {
        type_property.validate()?;
        if self.multiple && !type_property.supports_multiple() {
            return Err(Error::not_implemented(format!(
                "multiple-valued {} field",
                type_property.value_type()
            )));
        }
        self.type_property = type_property;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Validate a stored value sequence against this field's declaration:
    /// type tag, multiplicity, required flag, and type-specific constraints.
    pub fn validate_value(&self, value: &Multiple) -> Result<()> {
        if value.value_type() != self.value_type() {
            return Err(Error::type_mismatch(
                self.value_type().to_string(),
                value.value_type().to_string(),
            ));
        }
        if !self.multiple && value.len() > 1 {
            return Err(Error::validation(format!(
                "field '{}' accepts a single value, got {}",
                self.key,
                value.len()
            )));
        }
        if self.required && value.is_empty() {
            return Err(Error::validation(format!(
                "field '{}' is required",
                self.key
            )));
        }
        for v in value.iter() {
            self.type_property.validate_value(v)?;
        }
        Ok(())
    }
}

fn key_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"^[a-z0-9]+(?:[-_][a-z0-9]+)*$").unwrap())
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("Field name cannot be empty"));
    }
    if name.len() > 100 {
        return Err(Error::validation("Field name cannot exceed 100 characters"));
    }
    Ok(())
}

fn validate_key(key: &str) -> Result<()> {
    if !key_pattern().is_match(key) {
        return Err(Error::validation(format!(
            "Field key '{}' must be lowercase alphanumeric with - or _ separators",
            key
        )));
    }
    Ok(())
}

/// Builder for constructing Field instances with validation
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    name: Option<String>,
    key: Option<String>,
    description: Option<String>,
    type_property: Option<TypeProperty>,
    required: bool,
    unique: bool,
    multiple: bool,
}

impl FieldBuilder {
    /// Create a new field builder
    pub fn new() -> Self {
        Self {
            name: None,
            key: None,
            description: None,
            type_property: None,
            required: false,
            unique: false,
            multiple: false,
        }
    }

    /// Set the field name
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the field key
    pub fn key<S: Into<String>>(mut self, key: S) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the field description
    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the type-specific configuration
    pub fn type_property(mut self, type_property: TypeProperty) -> Self {
        self.type_property = Some(type_property);
        self
    }

    /// Mark the field required
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Mark the field unique across the model's items
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Mark the field multiple-valued
    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    /// Build the Field instance
    pub fn build(self) -> Result<Field> {
        let name = self
            .name
            .ok_or_else(|| Error::validation("Field name is required"))?;
        let key = self
            .key
            .ok_or_else(|| Error::validation("Field key is required"))?;
        let type_property = self
            .type_property
            .ok_or_else(|| Error::validation("Field type property is required"))?;

        let mut field = Field::new(name, key, type_property)?;
        if let Some(description) = self.description {
            field.set_description(description);
        }
        field.set_required(self.required);
        field.set_unique(self.unique);
        field.set_multiple(self.multiple)?;
        Ok(field)
    }
}

impl Default for FieldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn text_field(multiple: bool, required: bool) -> Field {
        Field::builder()
            .name("Title")
            .key("title")
            .type_property(TypeProperty::Text {
                max_length: Some(100),
            })
            .multiple(multiple)
            .required(required)
            .build()
            .unwrap()
    }

    #[test]
    fn test_field_builder() {
        let field = text_field(false, true);
        assert_eq!(field.name(), "Title");
        assert_eq!(field.key(), "title");
        assert_eq!(field.value_type(), ValueType::Text);
        assert!(field.required());
        assert!(!field.multiple());
    }

    #[test]
    fn test_key_format() {
        assert!(Field::new(
            "X".into(),
            "Bad Key".into(),
            TypeProperty::Bool
        )
        .is_err());
        assert!(Field::new("X".into(), "good-key_2".into(), TypeProperty::Bool).is_ok());
    }

    #[test]
    fn test_multiplicity_enforced() {
        let field = text_field(false, false);
        let two = Multiple::new(
            ValueType::Text,
            vec![Value::Text("a".into()), Value::Text("b".into())],
        )
        .unwrap();
        let err = field.validate_value(&two).unwrap_err();
        assert!(err.is_validation());

        let field = text_field(true, false);
        assert!(field.validate_value(&two).is_ok());
    }

    #[test]
    fn test_required_enforced() {
        let field = text_field(false, true);
        let empty = Multiple::empty(ValueType::Text);
        assert!(field.validate_value(&empty).is_err());

        let field = text_field(false, false);
        assert!(field.validate_value(&empty).is_ok());
    }

    #[test]
    fn test_tag_mismatch_detected() {
        let field = text_field(false, false);
        let wrong = Multiple::one(Value::Integer(3));
        let err = field.validate_value(&wrong).unwrap_err();
        assert!(err.is_type_mismatch());
    }

    #[test]
    fn test_multiple_reference_not_implemented() {
        let result = Field::builder()
            .name("Related")
            .key("related")
            .type_property(TypeProperty::Reference {
                model: crate::id::ModelId::new(),
                schema: crate::id::SchemaId::new(),
                correlation_field: None,
            })
            .multiple(true)
            .build();
        assert!(matches!(result, Err(Error::NotImplemented { .. })));
    }

    #[test]
    fn test_invalid_bounds_rejected_at_build() {
        let result = Field::builder()
            .name("Count")
            .key("count")
            .type_property(TypeProperty::Integer {
                min: Some(5),
                max: Some(1),
            })
            .build();
        assert!(matches!(result, Err(Error::InvalidTypeProperty { .. })));
    }
}
