//! Typed field values
//!
//! A [`Value`] is a discriminated union keyed by a [`ValueType`] tag; each
//! value owns exactly one concrete payload matching its tag. Typed accessors
//! return `None` on a tag mismatch, never panic. A [`Multiple`] is an ordered
//! sequence of same-typed values; single-valued fields are represented as a
//! Multiple of length <= 1 for storage uniformity.

use crate::id::{AssetId, ItemGroupId, ItemId};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::fmt;

/// Closed set of field value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    Text,
    TextArea,
    RichText,
    Markdown,
    Integer,
    Number,
    Bool,
    Checkbox,
    DateTime,
    Url,
    Asset,
    Reference,
    Tag,
    Group,
    GeometryObject,
    GeometryEditor,
    Select,
    Unknown,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::TextArea => "textArea",
            Self::RichText => "richText",
            Self::Markdown => "markdown",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Checkbox => "checkbox",
            Self::DateTime => "dateTime",
            Self::Url => "url",
            Self::Asset => "asset",
            Self::Reference => "reference",
            Self::Tag => "tag",
            Self::Group => "group",
            Self::GeometryObject => "geometryObject",
            Self::GeometryEditor => "geometryEditor",
            Self::Select => "select",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// GeoJSON geometry subtypes accepted by geometry fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryType {
    /// Map a GeoJSON `type` member to a geometry subtype
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Point" => Some(Self::Point),
            "MultiPoint" => Some(Self::MultiPoint),
            "LineString" => Some(Self::LineString),
            "MultiLineString" => Some(Self::MultiLineString),
            "Polygon" => Some(Self::Polygon),
            "MultiPolygon" => Some(Self::MultiPolygon),
            "GeometryCollection" => Some(Self::GeometryCollection),
            _ => None,
        }
    }
}

/// A typed field value
///
/// Constructed through [`Value::try_from_json`], which coerces a raw JSON
/// payload to the native representation of the requested type and fails with
/// a type mismatch when coercion is impossible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Value {
    Text(String),
    TextArea(String),
    RichText(String),
    Markdown(String),
    Integer(i64),
    Number(f64),
    Bool(bool),
    Checkbox(bool),
    DateTime(DateTime<Utc>),
    Url(String),
    Asset(AssetId),
    Reference(ItemId),
    Tag(String),
    Group(ItemGroupId),
    GeometryObject(Json),
    GeometryEditor(Json),
    Select(String),
}

impl Value {
    /// Coerce a raw JSON payload into a value of the given type
    pub fn try_from_json(value_type: ValueType, raw: &Json) -> Result<Self> {
        let mismatch = || Error::type_mismatch(value_type.to_string(), json_kind(raw));
        match value_type {
            ValueType::Text => as_string(raw).map(Self::Text).ok_or_else(mismatch),
            ValueType::TextArea => as_string(raw).map(Self::TextArea).ok_or_else(mismatch),
            ValueType::RichText => as_string(raw).map(Self::RichText).ok_or_else(mismatch),
            ValueType::Markdown => as_string(raw).map(Self::Markdown).ok_or_else(mismatch),
            ValueType::Integer => as_integer(raw).map(Self::Integer).ok_or_else(mismatch),
            ValueType::Number => as_number(raw).map(Self::Number).ok_or_else(mismatch),
            ValueType::Bool => raw.as_bool().map(Self::Bool).ok_or_else(mismatch),
            ValueType::Checkbox => raw.as_bool().map(Self::Checkbox).ok_or_else(mismatch),
            ValueType::DateTime => as_datetime(raw).map(Self::DateTime).ok_or_else(mismatch),
            ValueType::Url => as_url(raw).map(Self::Url).ok_or_else(mismatch),
            ValueType::Asset => as_id(raw).map(Self::Asset).ok_or_else(mismatch),
            ValueType::Reference => as_id(raw).map(Self::Reference).ok_or_else(mismatch),
            ValueType::Tag => as_string(raw).map(Self::Tag).ok_or_else(mismatch),
            ValueType::Group => as_id(raw).map(Self::Group).ok_or_else(mismatch),
            ValueType::GeometryObject => {
                validate_geometry(raw)?;
                Ok(Self::GeometryObject(raw.clone()))
            }
            ValueType::GeometryEditor => {
                validate_geometry(raw)?;
                Ok(Self::GeometryEditor(raw.clone()))
            }
            ValueType::Select => as_string(raw).map(Self::Select).ok_or_else(mismatch),
            ValueType::Unknown => Err(Error::type_mismatch("unknown", json_kind(raw))),
        }
    }

    /// The type tag of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Text(_) => ValueType::Text,
            Self::TextArea(_) => ValueType::TextArea,
            Self::RichText(_) => ValueType::RichText,
            Self::Markdown(_) => ValueType::Markdown,
            Self::Integer(_) => ValueType::Integer,
            Self::Number(_) => ValueType::Number,
            Self::Bool(_) => ValueType::Bool,
            Self::Checkbox(_) => ValueType::Checkbox,
            Self::DateTime(_) => ValueType::DateTime,
            Self::Url(_) => ValueType::Url,
            Self::Asset(_) => ValueType::Asset,
            Self::Reference(_) => ValueType::Reference,
            Self::Tag(_) => ValueType::Tag,
            Self::Group(_) => ValueType::Group,
            Self::GeometryObject(_) => ValueType::GeometryObject,
            Self::GeometryEditor(_) => ValueType::GeometryEditor,
            Self::Select(_) => ValueType::Select,
        }
    }

    /// Text payload of any string-like value (text, text area, rich text,
    /// markdown)
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::TextArea(s) | Self::RichText(s) | Self::Markdown(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean payload of a bool or checkbox value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) | Self::Checkbox(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_url(&self) -> Option<&str> {
        match self {
            Self::Url(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_asset(&self) -> Option<AssetId> {
        match self {
            Self::Asset(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ItemId> {
        match self {
            Self::Reference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&str> {
        match self {
            Self::Tag(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<ItemGroupId> {
        match self {
            Self::Group(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&Json> {
        match self {
            Self::GeometryObject(g) | Self::GeometryEditor(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_select(&self) -> Option<&str> {
        match self {
            Self::Select(s) => Some(s),
            _ => None,
        }
    }

    /// GeoJSON subtype of a geometry value
    pub fn geometry_type(&self) -> Option<GeometryType> {
        self.as_geometry()
            .and_then(|g| g.get("type"))
            .and_then(Json::as_str)
            .and_then(GeometryType::from_name)
    }
}

/// An ordered sequence of same-typed values
///
/// Fields declared non-multiple always carry exactly 0 or 1 value; fields
/// declared multiple carry 0..N. Homogeneity is enforced at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multiple {
    value_type: ValueType,
    values: Vec<Value>,
}

impl Multiple {
    /// Create a sequence, rejecting values whose tag differs from the
    /// declared type
    pub fn new(value_type: ValueType, values: Vec<Value>) -> Result<Self> {
        for v in &values {
            if v.value_type() != value_type {
                return Err(Error::type_mismatch(
                    value_type.to_string(),
                    v.value_type().to_string(),
                ));
            }
        }
        Ok(Self { value_type, values })
    }

    /// Create an empty sequence of the given type
    pub fn empty(value_type: ValueType) -> Self {
        Self {
            value_type,
            values: Vec::new(),
        }
    }

    /// Wrap a single value
    pub fn one(value: Value) -> Self {
        Self {
            value_type: value.value_type(),
            values: vec![value],
        }
    }

    /// Coerce a raw JSON payload into a sequence of the given type.
    ///
    /// A JSON array becomes one value per element; any other payload becomes
    /// a single-element sequence. JSON null becomes an empty sequence.
    pub fn try_from_json(value_type: ValueType, raw: &Json) -> Result<Self> {
        let values = match raw {
            Json::Null => Vec::new(),
            Json::Array(elements) => elements
                .iter()
                .map(|e| Value::try_from_json(value_type, e))
                .collect::<Result<Vec<_>>>()?,
            other => vec![Value::try_from_json(value_type, other)?],
        };
        Ok(Self { value_type, values })
    }

    /// The declared type of every element
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The head element, if any
    pub fn first(&self) -> Option<&Value> {
        self.values.first()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }
}

fn as_string(raw: &Json) -> Option<String> {
    raw.as_str().map(str::to_owned)
}

fn as_integer(raw: &Json) -> Option<i64> {
    if let Some(i) = raw.as_i64() {
        return Some(i);
    }
    raw.as_str().and_then(|s| s.parse().ok())
}

fn as_number(raw: &Json) -> Option<f64> {
    if let Some(n) = raw.as_f64() {
        return Some(n);
    }
    raw.as_str().and_then(|s| s.parse().ok())
}

fn as_datetime(raw: &Json) -> Option<DateTime<Utc>> {
    raw.as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn as_url(raw: &Json) -> Option<String> {
    let s = raw.as_str()?;
    if s.contains("://") && !s.contains(char::is_whitespace) {
        Some(s.to_owned())
    } else {
        None
    }
}

fn as_id<T: std::str::FromStr>(raw: &Json) -> Option<T> {
    raw.as_str().and_then(|s| s.parse().ok())
}

/// Human-readable kind of a raw JSON payload, for error messages
fn json_kind(raw: &Json) -> &'static str {
    match raw {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

/// Structural GeoJSON check: a geometry object must carry a recognized
/// `type` member and either `coordinates` or, for collections, `geometries`.
fn validate_geometry(raw: &Json) -> Result<()> {
    let obj = raw
        .as_object()
        .ok_or_else(|| Error::type_mismatch("geometry object", json_kind(raw)))?;
    let type_name = obj
        .get("type")
        .and_then(Json::as_str)
        .ok_or_else(|| Error::type_mismatch("geometry object", "object without type"))?;
    let geometry_type = GeometryType::from_name(type_name).ok_or_else(|| {
        Error::type_mismatch("geometry object", "unrecognized geometry subtype")
    })?;
    let payload_key = if geometry_type == GeometryType::GeometryCollection {
        "geometries"
    } else {
        "coordinates"
    };
    if !obj.contains_key(payload_key) {
        return Err(Error::type_mismatch(
            "geometry object",
            "geometry without payload",
        ));
    }
    Ok(())
}
