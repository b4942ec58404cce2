//! Type-specific field configuration
//!
//! Each field carries exactly one [`TypeProperty`] variant. The closed enum
//! replaces open-ended visitor dispatch: extracting type-specific
//! configuration is an exhaustive `match`, so adding a field type is a
//! compile-time-checked, single-point change.

use crate::id::{FieldId, ModelId, SchemaId};
use crate::value::{GeometryType, Value, ValueType};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Type-specific constraints of a schema field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TypeProperty {
    Text {
        max_length: Option<usize>,
    },
    TextArea {
        max_length: Option<usize>,
    },
    RichText {
        max_length: Option<usize>,
    },
    Markdown {
        max_length: Option<usize>,
    },
    Integer {
        min: Option<i64>,
        max: Option<i64>,
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
    },
    Bool,
    Checkbox,
    DateTime,
    Url,
    Asset,
    /// Reference to an item of another model, optionally correlated back
    /// through a field on the target schema
    Reference {
        model: ModelId,
        schema: SchemaId,
        correlation_field: Option<FieldId>,
    },
    /// Closed tag vocabulary; stored values must be members
    Tag {
        tags: Vec<String>,
    },
    /// Nested group whose field list lives in its own schema, so one group
    /// definition can be reused across parent schemas
    Group {
        group_schema: SchemaId,
    },
    GeometryObject {
        supported: Vec<GeometryType>,
    },
    GeometryEditor {
        supported: Vec<GeometryType>,
    },
    Select {
        values: Vec<String>,
    },
}

impl TypeProperty {
    /// The value type this property accepts
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Text { .. } => ValueType::Text,
            Self::TextArea { .. } => ValueType::TextArea,
            Self::RichText { .. } => ValueType::RichText,
            Self::Markdown { .. } => ValueType::Markdown,
            Self::Integer { .. } => ValueType::Integer,
            Self::Number { .. } => ValueType::Number,
            Self::Bool => ValueType::Bool,
            Self::Checkbox => ValueType::Checkbox,
            Self::DateTime => ValueType::DateTime,
            Self::Url => ValueType::Url,
            Self::Asset => ValueType::Asset,
            Self::Reference { .. } => ValueType::Reference,
            Self::Tag { .. } => ValueType::Tag,
            Self::Group { .. } => ValueType::Group,
            Self::GeometryObject { .. } => ValueType::GeometryObject,
            Self::GeometryEditor { .. } => ValueType::GeometryEditor,
            Self::Select { .. } => ValueType::Select,
        }
    }

    /// Whether this type may be declared multiple. Reference fields forbid
    /// multiplicity; requesting it is a recognized-but-unsupported
    /// combination.
    pub fn supports_multiple(&self) -> bool {
        !matches!(self, Self::Reference { .. })
    }

    /// Check internal consistency of the configuration itself
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Integer { min, max } => {
                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return Err(Error::invalid_type_property(format!(
                            "integer min {} exceeds max {}",
                            min, max
                        )));
                    }
                }
            }
            Self::Number { min, max } => {
                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return Err(Error::invalid_type_property(format!(
                            "number min {} exceeds max {}",
                            min, max
                        )));
                    }
                }
            }
            Self::Tag { tags } => {
                if tags.is_empty() {
                    return Err(Error::invalid_type_property("tag vocabulary is empty"));
                }
                let mut seen = std::collections::HashSet::new();
                for tag in tags {
                    if !seen.insert(tag.as_str()) {
                        return Err(Error::invalid_type_property(format!(
                            "duplicate tag '{}' in vocabulary",
                            tag
                        )));
                    }
                }
            }
            Self::Select { values } => {
                if values.is_empty() {
                    return Err(Error::invalid_type_property("select options are empty"));
                }
            }
            Self::GeometryObject { supported } | Self::GeometryEditor { supported } => {
                if supported.is_empty() {
                    return Err(Error::invalid_type_property(
                        "no supported geometry subtypes",
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Check a coerced value against these constraints
    pub fn validate_value(&self, value: &Value) -> Result<()> {
        if value.value_type() != self.value_type() {
            return Err(Error::type_mismatch(
                self.value_type().to_string(),
                value.value_type().to_string(),
            ));
        }
        match self {
            Self::Text { max_length }
            | Self::TextArea { max_length }
            | Self::RichText { max_length }
            | Self::Markdown { max_length } => {
                if let (Some(max), Some(text)) = (max_length, value.as_text()) {
                    if text.chars().count() > *max {
                        return Err(Error::validation(format!(
                            "text exceeds maximum length {}",
                            max
                        )));
                    }
                }
            }
            Self::Integer { min, max } => {
                let n = value.as_integer().unwrap_or_default();
                if min.is_some_and(|min| n < min) || max.is_some_and(|max| n > max) {
                    return Err(Error::validation(format!("integer {} is out of range", n)));
                }
            }
            Self::Number { min, max } => {
                let n = value.as_number().unwrap_or_default();
                if min.is_some_and(|min| n < min) || max.is_some_and(|max| n > max) {
                    return Err(Error::validation(format!("number {} is out of range", n)));
                }
            }
            Self::Tag { tags } => {
                let tag = value.as_tag().unwrap_or_default();
                if !tags.iter().any(|t| t == tag) {
                    return Err(Error::validation(format!(
                        "tag '{}' is not in the vocabulary",
                        tag
                    )));
                }
            }
            Self::Select { values } => {
                let selected = value.as_select().unwrap_or_default();
                if !values.iter().any(|v| v == selected) {
                    return Err(Error::validation(format!(
                        "'{}' is not a valid option",
                        selected
                    )));
                }
            }
            Self::GeometryObject { supported } | Self::GeometryEditor { supported } => {
                match value.geometry_type() {
                    Some(subtype) if supported.contains(&subtype) => {}
                    Some(subtype) => {
                        return Err(Error::validation(format!(
                            "geometry subtype {:?} is not supported by this field",
                            subtype
                        )))
                    }
                    None => {
                        return Err(Error::type_mismatch(
                            self.value_type().to_string(),
                            "malformed geometry",
                        ))
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}
