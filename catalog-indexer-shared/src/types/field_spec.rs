//! Field schema descriptors.
//!
//! A `FieldSpec` names one document field and tells the index engine how to store it.
//! Type strings follow the index engine's notation: a primitive kind, optionally
//! suffixed with `[]` for arrays, plus the special `string*` and `auto` types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Primitive value kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Int32,
    Int64,
    Float,
    Bool,
    GeoPoint,
    Object,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Int32 => "int32",
            FieldKind::Int64 => "int64",
            FieldKind::Float => "float",
            FieldKind::Bool => "bool",
            FieldKind::GeoPoint => "geopoint",
            FieldKind::Object => "object",
        }
    }

    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "string" => Some(FieldKind::String),
            "int32" => Some(FieldKind::Int32),
            "int64" => Some(FieldKind::Int64),
            "float" => Some(FieldKind::Float),
            "bool" => Some(FieldKind::Bool),
            "geopoint" => Some(FieldKind::GeoPoint),
            "object" => Some(FieldKind::Object),
            _ => None,
        }
    }

    /// Zero value used for required fields left empty, if the kind has one.
    fn zero_value(self) -> Option<Value> {
        match self {
            FieldKind::String => Some(json!("")),
            FieldKind::Int32 | FieldKind::Int64 => Some(json!(0)),
            FieldKind::Float => Some(json!(0.0)),
            FieldKind::Bool => Some(json!(false)),
            FieldKind::GeoPoint | FieldKind::Object => None,
        }
    }
}

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldType {
    Scalar(FieldKind),
    Array(FieldKind),
    /// `string*`: values are coerced to `string` or `string[]` by the engine.
    StringAuto,
    /// `auto`: the engine infers the type from indexed documents.
    Auto,
}

impl FieldType {
    pub fn is_array(self) -> bool {
        matches!(self, FieldType::Array(_))
    }

    /// The value a required field receives when nothing was materialized for it.
    ///
    /// Arrays get `[]`, numbers `0`, booleans `false` and strings `""`. Geo points,
    /// objects and `auto` fields have no zero value.
    pub fn zero_value(self) -> Option<Value> {
        match self {
            FieldType::Array(_) => Some(json!([])),
            FieldType::Scalar(kind) => kind.zero_value(),
            FieldType::StringAuto => Some(json!("")),
            FieldType::Auto => None,
        }
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "string*" => return Ok(FieldType::StringAuto),
            "auto" => return Ok(FieldType::Auto),
            _ => {}
        }
        let (kind, is_array) = match s.strip_suffix("[]") {
            Some(kind) => (kind, true),
            None => (s, false),
        };
        let kind = FieldKind::parse(kind).ok_or_else(|| format!("unknown field type '{}'", s))?;
        Ok(if is_array {
            FieldType::Array(kind)
        } else {
            FieldType::Scalar(kind)
        })
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(kind) => f.write_str(kind.as_str()),
            FieldType::Array(kind) => write!(f, "{}[]", kind.as_str()),
            FieldType::StringAuto => f.write_str("string*"),
            FieldType::Auto => f.write_str("auto"),
        }
    }
}

impl TryFrom<String> for FieldType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.to_string()
    }
}

/// A named, typed field of the product collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub optional: bool,
    #[serde(default = "default_index")]
    pub index: bool,
    #[serde(default)]
    pub facet: bool,
    #[serde(default)]
    pub sort: bool,
    #[serde(default)]
    pub infix: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

fn default_index() -> bool {
    true
}

impl FieldSpec {
    /// A required, indexed field with every other flag off.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            optional: false,
            index: true,
            facet: false,
            sort: false,
            infix: false,
            locale: None,
        }
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn indexed(mut self, index: bool) -> Self {
        self.index = index;
        self
    }

    pub fn facet(mut self, facet: bool) -> Self {
        self.facet = facet;
        self
    }

    pub fn sortable(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    /// Apply the optionality rule: an unindexed field can never be required.
    pub fn normalized(mut self) -> Self {
        if !self.index {
            self.optional = true;
        }
        self
    }
}
