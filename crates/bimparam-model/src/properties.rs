// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed property values attached to elements and instances

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single typed property value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    /// Real number (lengths, areas, ratings)
    Real(f64),
    /// Integer value (counts, classes)
    Integer(i64),
    /// Boolean flag (e.g. IsExternal)
    Boolean(bool),
    /// Free text or enumeration label
    Text(String),
}

impl PropertyValue {
    /// Numeric view of the value (integers widen to f64)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Real(v) => Some(*v),
            PropertyValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Text view of the value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view of the value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Check if the value is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(self, PropertyValue::Real(_) | PropertyValue::Integer(_))
    }

    /// Name of the value type
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Real(_) => "real",
            PropertyValue::Integer(_) => "integer",
            PropertyValue::Boolean(_) => "boolean",
            PropertyValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Real(v) => write!(f, "{}", v),
            PropertyValue::Integer(v) => write!(f, "{}", v),
            PropertyValue::Boolean(v) => write!(f, "{}", v),
            PropertyValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Real(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Integer(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Boolean(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

/// Property name to value mapping with unique, ordered keys
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Build a property map from a list where later entries win
pub fn collect_properties<I>(entries: I) -> PropertyMap
where
    I: IntoIterator<Item = (String, PropertyValue)>,
{
    let mut map = PropertyMap::new();
    for (name, value) in entries {
        map.insert(name, value);
    }
    map
}
