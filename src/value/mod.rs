use crate::estimator::Estimator;
use crate::special::{CrossValidator, FrozenDistribution, Function, ScalarType};
use indexmap::IndexMap;
use std::fmt;

mod scalar;

pub use scalar::NumericScalar;

/// Named parameters of an estimator or cross-validator, in declaration order.
pub type Params = IndexMap<String, Value>;

/// Runtime values that the codec knows how to encode.
///
/// The vocabulary is closed on purpose: anything that is not one of these
/// variants cannot be part of a flow.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Scalar(NumericScalar),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// An unordered mapping; encoding canonicalizes it to sorted-key order.
    Dict(Vec<(Value, Value)>),
    /// A mapping whose insertion order is part of its meaning.
    OrderedDict(Vec<(Value, Value)>),
    Type(ScalarType),
    Distribution(FrozenDistribution),
    Function(Function),
    CrossValidator(Box<dyn CrossValidator>),
    Model(Box<dyn Estimator>),
}

impl Value {
    /// Builds an unordered mapping from string keys.
    pub fn dict<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Dict(
            entries
                .into_iter()
                .map(|(k, v)| (Value::Str(k.into()), v))
                .collect(),
        )
    }

    /// Builds an insertion-ordered mapping from string keys.
    pub fn ordered_dict<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::OrderedDict(
            entries
                .into_iter()
                .map(|(k, v)| (Value::Str(k.into()), v))
                .collect(),
        )
    }

    pub fn model(model: impl Estimator + 'static) -> Self {
        Value::Model(Box::new(model))
    }

    /// A `(name, model)` pipeline step.
    pub fn step(name: &str, model: impl Estimator + 'static) -> Self {
        Value::Tuple(vec![Value::Str(name.to_string()), Value::model(model)])
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Scalar(s) => s.type_name(),
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::OrderedDict(_) => "ordered dict",
            Value::Type(_) => "type",
            Value::Distribution(_) => "distribution",
            Value::Function(_) => "function",
            Value::CrossValidator(_) => "cross-validator",
            Value::Model(_) => "model",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Scalar(s) => s.to_portable().as_f64(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Scalar(s) if s.is_integer() => s.to_portable().as_i64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&dyn Estimator> {
        match self {
            Value::Model(m) => Some(m.as_ref()),
            _ => None,
        }
    }

    /// Elements of a list or tuple.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Entries of an ordered or unordered mapping.
    pub fn as_mapping(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Dict(entries) | Value::OrderedDict(entries) => Some(entries),
            _ => None,
        }
    }
}

fn same_entries(a: &[(Value, Value)], b: &[(Value, Value)]) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(ka, va)| b.iter().any(|(kb, vb)| ka == kb && va == vb))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Scalar(a), Value::Scalar(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => a == b,
            // Order only matters when both sides declare it.
            (Value::OrderedDict(a), Value::OrderedDict(b)) => a == b,
            (Value::Dict(a), Value::Dict(b))
            | (Value::Dict(a), Value::OrderedDict(b))
            | (Value::OrderedDict(a), Value::Dict(b)) => same_entries(a, b),
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Distribution(a), Value::Distribution(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::CrossValidator(a), Value::CrossValidator(b)) => {
                a.class_name() == b.class_name() && a.get_params() == b.get_params()
            }
            (Value::Model(a), Value::Model(b)) => {
                a.class_name() == b.class_name() && a.get_params() == b.get_params()
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "'{}'", s),
            Value::Scalar(s) => write!(f, "{}", s.to_portable()),
            Value::List(items) => {
                write!(f, "[")?;
                write_joined(f, items)?;
                write!(f, "]")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_joined(f, items)?;
                write!(f, ")")
            }
            Value::Dict(entries) | Value::OrderedDict(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Type(t) => write!(f, "<type {}>", t),
            Value::Distribution(d) => write!(f, "<{} distribution>", d.name()),
            Value::Function(func) => write!(f, "<function {}>", func.name()),
            Value::CrossValidator(cv) => write!(f, "{}", cv.class_name()),
            Value::Model(m) => write!(f, "{}", m.class_name()),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<ScalarType> for Value {
    fn from(v: ScalarType) -> Self {
        Value::Type(v)
    }
}

impl From<FrozenDistribution> for Value {
    fn from(v: FrozenDistribution) -> Self {
        Value::Distribution(v)
    }
}

impl From<Function> for Value {
    fn from(v: Function) -> Self {
        Value::Function(v)
    }
}
