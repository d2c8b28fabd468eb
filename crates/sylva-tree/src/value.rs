//! Plain attribute values and name references

use crate::node::{Node, NodeRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::{Rc, Weak};

/// Values that can be stored in attribute properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean value
    Boolean(bool),

    /// Integer value
    Integer(i64),

    /// Decimal value
    Decimal(f64),

    /// String value
    String(String),

    /// Null/empty value
    Null,
}

impl Value {
    /// Convert value to string
    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Decimal(d) => Some(d.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::Null => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Decimal(d) => Some(*d),
            #[allow(clippy::cast_precision_loss)]
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Decimal(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A reference to a node by its name.
///
/// The referred node is held weakly: references never own what they point
/// to. Resolution is done by semantic passes outside this crate.
#[derive(Clone, Default)]
pub struct ReferenceByName {
    name: String,
    referred: Option<Weak<Node>>,
}

impl ReferenceByName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            referred: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Point the reference at `node`
    pub fn resolve(&mut self, node: &NodeRef) {
        self.referred = Some(Rc::downgrade(node));
    }

    /// Resolved and the target still alive
    pub fn is_resolved(&self) -> bool {
        self.referred().is_some()
    }

    pub fn referred(&self) -> Option<NodeRef> {
        self.referred.as_ref().and_then(Weak::upgrade)
    }
}

impl fmt::Debug for ReferenceByName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceByName")
            .field("name", &self.name)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl PartialEq for ReferenceByName {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && match (self.referred(), other.referred()) {
                (Some(a), Some(b)) => Rc::ptr_eq(&a, &b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl fmt::Display for ReferenceByName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref:{}", self.name)
    }
}
