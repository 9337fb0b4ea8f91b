//! Free-form simulation parameters
//!
//! Material, interface and solver parameters are open-ended nested maps whose keys are
//! defined by the solver rather than by this crate. They are stored as a tree of
//! [`PropertyValue`]s and only the handful of keys this crate inspects are validated.

use crate::errors::{CipherError, CipherResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A nested map of named parameter values.
pub type Properties = BTreeMap<String, PropertyValue>;

/// A single parameter value.
///
/// Deserialization tries the variants in declaration order, so integral numbers become
/// [`PropertyValue::Integer`] and all other numbers [`PropertyValue::Float`]. An empty
/// value (`~` or `null`) is kept as [`PropertyValue::Null`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
    Map(Properties),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Numeric value, converting integers to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Properties> {
        match self {
            PropertyValue::Map(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<Properties> for PropertyValue {
    fn from(value: Properties) -> Self {
        PropertyValue::Map(value)
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropertyValue::Null, Into::into)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(value: Vec<T>) -> Self {
        PropertyValue::List(value.into_iter().map(Into::into).collect())
    }
}

/// Set the value at a nested key path, creating intermediate maps as required.
///
/// Fails if an intermediate key already holds something other than a map.
pub fn set_by_path(
    root: &mut Properties,
    path: &[&str],
    value: impl Into<PropertyValue>,
) -> CipherResult<()> {
    let Some((last, parents)) = path.split_last() else {
        return Err(CipherError::EmptyPropertyPath);
    };

    let mut current = root;
    for key in parents {
        let entry = current
            .entry(key.to_string())
            .or_insert_with(|| PropertyValue::Map(Properties::new()));
        current = match entry {
            PropertyValue::Map(map) => map,
            _ => {
                return Err(CipherError::PropertyPath {
                    path: path.iter().map(|s| s.to_string()).collect(),
                    key: key.to_string(),
                })
            }
        };
    }
    current.insert(last.to_string(), value.into());
    Ok(())
}

/// Get the value at a nested key path, if present.
pub fn get_by_path<'a>(root: &'a Properties, path: &[&str]) -> Option<&'a PropertyValue> {
    let (last, parents) = path.split_last()?;
    let mut current = root;
    for key in parents {
        current = current.get(*key)?.as_map()?;
    }
    current.get(*last)
}
