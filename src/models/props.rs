//! Edge property bags.
//!
//! The edge table carries an open key-value `props` map. Rather than an
//! untyped `any`, props are a minimal JSON-like sum type so `is_primary`
//! extraction and the structural equality used by diffing are written once.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key under which containment edges record their primary flag.
pub const IS_PRIMARY: &str = "is_primary";

/// A JSON-like property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<PropValue>),
    Map(BTreeMap<String, PropValue>),
}

/// An edge property bag. `BTreeMap` gives deterministic ordering, so
/// structural equality and serialization are stable across replays.
pub type Props = BTreeMap<String, PropValue>;

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        PropValue::Int(v)
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        PropValue::Float(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Str(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::Str(v)
    }
}

impl PropValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Read the `is_primary` flag from a props bag. Absent or non-boolean
/// values read as false.
pub fn is_primary(props: &Props) -> bool {
    props
        .get(IS_PRIMARY)
        .and_then(PropValue::as_bool)
        .unwrap_or(false)
}

/// Set the `is_primary` flag on a props bag.
pub fn set_is_primary(props: &mut Props, primary: bool) {
    props.insert(IS_PRIMARY.to_string(), PropValue::Bool(primary));
}

/// Build a props bag carrying only the `is_primary` flag.
pub fn primary_props(primary: bool) -> Props {
    let mut props = Props::new();
    set_is_primary(&mut props, primary);
    props
}
