//! Runtime values checked by the matcher.
//!
//! [`Value`] models the dynamic values a type can describe: primitives,
//! arrays, plain objects, class instances (objects carrying a
//! [`Constructor`]) and functions. JSON documents convert losslessly into
//! plain values via `From<serde_json::Value>`.

use crate::format::Constructor;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    String(Arc<str>),
    Symbol(SymbolValue),
    Array(Vec<Value>),
    Object(ObjectValue),
    Function(FunctionValue),
}

/// A unique symbol. Two symbols are equal only if they are the same symbol.
#[derive(Clone, Debug)]
pub struct SymbolValue {
    id: u64,
    pub description: Option<Arc<str>>,
}

impl SymbolValue {
    pub fn new(description: Option<&str>) -> Self {
        Self {
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
            description: description.map(Arc::from),
        }
    }
}

impl PartialEq for SymbolValue {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// An object with ordered own properties.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectValue {
    pub constructor: Option<Constructor>,
    pub properties: IndexMap<String, Value>,
}

impl ObjectValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// An instance of the class whose runtime constructor is `ctor`.
    pub fn instance_of(ctor: &Constructor) -> Self {
        Self {
            constructor: Some(ctor.clone()),
            properties: IndexMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// A callable value. Only its presence is observable to the matcher.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionValue {
    pub name: Option<Arc<str>>,
}

impl FunctionValue {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

impl Value {
    pub fn string(s: &str) -> Self {
        Self::String(s.into())
    }

    pub fn object(properties: impl IntoIterator<Item = (&'static str, Value)>) -> Self {
        Self::Object(ObjectValue {
            constructor: None,
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
        })
    }

    /// JavaScript `typeof`.
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null | Self::Array(_) | Self::Object(_) => "object",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::BigInt(_) => "bigint",
            Self::String(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Function(_) => "function",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Property lookup on objects and functions. Missing properties read as
    /// `None`, which the matcher treats like `undefined`.
    pub fn property(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Object(object) => object.get(name),
            _ => None,
        }
    }

    /// Stable address used to tell repeated visits of the same value apart
    /// from visits of different values with the same shape.
    pub fn address(&self) -> usize {
        std::ptr::from_ref(self) as usize
    }

    /// Short description for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_owned(),
            Self::Null => "null".to_owned(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::BigInt(n) => format!("{n}n"),
            Self::String(s) => format!("{s:?}"),
            Self::Symbol(sym) => match &sym.description {
                Some(desc) => format!("Symbol({desc})"),
                None => "Symbol()".to_owned(),
            },
            Self::Array(items) => format!("array({})", items.len()),
            Self::Object(object) => match &object.constructor {
                Some(ctor) => format!("{} instance", ctor.name()),
                None => "object".to_owned(),
            },
            Self::Function(func) => match &func.name {
                Some(name) => format!("function {name}"),
                None => "function".to_owned(),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<ObjectValue> for Value {
    fn from(object: ObjectValue) -> Self {
        Self::Object(object)
    }
}

impl From<FunctionValue> for Value {
    fn from(func: FunctionValue) -> Self {
        Self::Function(func)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s.into()),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Self::Object(ObjectValue {
                constructor: None,
                properties: map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_objects_keep_property_order() {
        let value = Value::from(json!({"b": 1, "a": [true, null], "c": "x"}));
        let Value::Object(object) = value else {
            panic!("expected an object");
        };
        let keys: Vec<&str> = object.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "a", "c"]);
        assert_eq!(object.get("a"), Some(&Value::Array(vec![Value::Bool(true), Value::Null])));
    }

    #[test]
    fn symbols_compare_by_identity() {
        let a = SymbolValue::new(Some("tag"));
        let b = SymbolValue::new(Some("tag"));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn type_of_matches_javascript() {
        assert_eq!(Value::Null.type_of(), "object");
        assert_eq!(Value::Array(vec![]).type_of(), "object");
        assert_eq!(Value::Function(FunctionValue::default()).type_of(), "function");
        assert_eq!(Value::BigInt(3).type_of(), "bigint");
    }

    #[test]
    fn instances_describe_their_class() {
        let point = Constructor::new("Point");
        let value = Value::from(ObjectValue::instance_of(&point).with("x", 1));
        assert_eq!(value.describe(), "Point instance");
        assert_eq!(value.property("x"), Some(&Value::Number(1.0)));
    }
}
