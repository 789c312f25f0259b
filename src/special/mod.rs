//! The closed set of non-model objects that travel as tagged records.
//!
//! Every record is a JSON object of the form
//! `{"oml-python:serialized_object": <tag>, "value": <payload>}`.

use crate::codec::Serialized;
use crate::error::CodecError;
use indexmap::IndexMap;
use serde_json::{Map, Number, Value as Json};

mod distribution;
mod function;
mod splitter;
mod types;

pub use distribution::{DistributionFamily, FrozenDistribution};
pub(crate) use distribution::argument;
pub use function::{Function, ScoreFn};
pub use splitter::{CrossValidator, Fold};
pub use types::ScalarType;

/// Discriminator key of every tagged record. User mappings may not use it.
pub const SERIALIZED_OBJECT_KEY: &str = "oml-python:serialized_object";
pub const VALUE_KEY: &str = "value";

const TYPE_TAG: &str = "type";
const DISTRIBUTION_TAG: &str = "rv_frozen";
const FUNCTION_TAG: &str = "function";
const COMPONENT_REFERENCE_TAG: &str = "component_reference";
const CROSS_VALIDATOR_TAG: &str = "cv_object";

#[derive(Debug, Clone, PartialEq)]
pub enum SpecialObject {
    /// Canonical short name of a type, e.g. `np.float64`.
    Type(String),
    Distribution(DistributionRecord),
    /// Fully qualified function name.
    Function(String),
    ComponentReference(ComponentReference),
    CrossValidator(CrossValidatorRecord),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionRecord {
    pub dist: String,
    pub a: f64,
    pub b: f64,
    pub args: Vec<Serialized>,
    pub kwds: IndexMap<String, Serialized>,
}

/// Placeholder for a component of the enclosing flow.
///
/// `step_name == None` means the parameter value is the component itself;
/// otherwise the reference stands for one named step of a sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentReference {
    pub key: String,
    pub step_name: Option<String>,
    pub argument_1: Option<Box<Serialized>>,
}

impl ComponentReference {
    pub fn single(key: &str) -> Self {
        Self {
            key: key.to_string(),
            step_name: None,
            argument_1: None,
        }
    }

    pub fn step(identifier: &str, argument_1: Option<Serialized>) -> Self {
        Self {
            key: identifier.to_string(),
            step_name: Some(identifier.to_string()),
            argument_1: argument_1.map(Box::new),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidatorRecord {
    pub name: String,
    /// Constructor parameters as wire strings; `None` marks an empty value.
    pub parameters: IndexMap<String, Option<String>>,
}

impl SpecialObject {
    pub fn tag(&self) -> &'static str {
        match self {
            SpecialObject::Type(_) => TYPE_TAG,
            SpecialObject::Distribution(_) => DISTRIBUTION_TAG,
            SpecialObject::Function(_) => FUNCTION_TAG,
            SpecialObject::ComponentReference(_) => COMPONENT_REFERENCE_TAG,
            SpecialObject::CrossValidator(_) => CROSS_VALIDATOR_TAG,
        }
    }

    pub fn to_json(&self) -> Result<Json, CodecError> {
        let payload = match self {
            SpecialObject::Type(name) | SpecialObject::Function(name) => Json::String(name.clone()),
            SpecialObject::Distribution(record) => {
                let mut value = Map::new();
                value.insert("dist".into(), Json::String(record.dist.clone()));
                value.insert("a".into(), bound_to_json(record.a));
                value.insert("b".into(), bound_to_json(record.b));
                let args = record
                    .args
                    .iter()
                    .map(Serialized::to_json)
                    .collect::<Result<Vec<_>, _>>()?;
                value.insert("args".into(), Json::Array(args));
                let mut kwds = Map::new();
                for (name, arg) in &record.kwds {
                    kwds.insert(name.clone(), arg.to_json()?);
                }
                value.insert("kwds".into(), Json::Object(kwds));
                Json::Object(value)
            }
            SpecialObject::ComponentReference(reference) => {
                let mut value = Map::new();
                value.insert("key".into(), Json::String(reference.key.clone()));
                value.insert(
                    "step_name".into(),
                    reference
                        .step_name
                        .clone()
                        .map(Json::String)
                        .unwrap_or(Json::Null),
                );
                if let Some(argument) = &reference.argument_1 {
                    value.insert("argument_1".into(), argument.to_json()?);
                }
                Json::Object(value)
            }
            SpecialObject::CrossValidator(record) => {
                let parameters = record
                    .parameters
                    .iter()
                    .map(|(name, wire)| {
                        let value = wire.clone().map(Json::String).unwrap_or(Json::Null);
                        (name.clone(), value)
                    })
                    .collect::<Map<_, _>>();
                let mut value = Map::new();
                value.insert("name".into(), Json::String(record.name.clone()));
                value.insert("parameters".into(), Json::Object(parameters));
                Json::Object(value)
            }
        };

        let mut object = Map::new();
        object.insert(SERIALIZED_OBJECT_KEY.into(), Json::String(self.tag().into()));
        object.insert(VALUE_KEY.into(), payload);
        Ok(Json::Object(object))
    }

    /// Parses the payload of a tagged record. Unknown tags are fatal.
    pub fn from_tagged(tag: &str, payload: &Json) -> Result<Self, CodecError> {
        match tag {
            TYPE_TAG => Ok(SpecialObject::Type(expect_str(payload, tag)?.to_string())),
            FUNCTION_TAG => Ok(SpecialObject::Function(expect_str(payload, tag)?.to_string())),
            DISTRIBUTION_TAG => {
                let dist = expect_str(field(payload, "dist", tag)?, tag)?.to_string();
                let a = bound_from_json(field(payload, "a", tag)?)?;
                let b = bound_from_json(field(payload, "b", tag)?)?;
                let args = match payload.get("args") {
                    Some(Json::Array(items)) => items
                        .iter()
                        .map(Serialized::from_json)
                        .collect::<Result<Vec<_>, _>>()?,
                    Some(Json::Null) | None => Vec::new(),
                    Some(other) => return Err(malformed(tag, &format!("args must be a list, found {}", other))),
                };
                let mut kwds = IndexMap::new();
                if let Some(Json::Object(entries)) = payload.get("kwds") {
                    for (name, value) in entries {
                        kwds.insert(name.clone(), Serialized::from_json(value)?);
                    }
                }
                Ok(SpecialObject::Distribution(DistributionRecord {
                    dist,
                    a,
                    b,
                    args,
                    kwds,
                }))
            }
            COMPONENT_REFERENCE_TAG => {
                let key = expect_str(field(payload, "key", tag)?, tag)?.to_string();
                let step_name = match payload.get("step_name") {
                    None | Some(Json::Null) => None,
                    Some(Json::String(name)) => Some(name.clone()),
                    Some(other) => {
                        return Err(malformed(tag, &format!("step_name must be a string, found {}", other)));
                    }
                };
                let argument_1 = payload
                    .get("argument_1")
                    .map(|value| Serialized::from_json(value).map(Box::new))
                    .transpose()?;
                Ok(SpecialObject::ComponentReference(ComponentReference {
                    key,
                    step_name,
                    argument_1,
                }))
            }
            CROSS_VALIDATOR_TAG => {
                let name = expect_str(field(payload, "name", tag)?, tag)?.to_string();
                let mut parameters = IndexMap::new();
                if let Some(Json::Object(entries)) = payload.get("parameters") {
                    for (key, value) in entries {
                        let wire = match value {
                            Json::Null => None,
                            Json::String(s) => Some(s.clone()),
                            other => Some(other.to_string()),
                        };
                        parameters.insert(key.clone(), wire);
                    }
                }
                Ok(SpecialObject::CrossValidator(CrossValidatorRecord { name, parameters }))
            }
            unknown => Err(CodecError::MalformedReference(format!(
                "cannot decode serialized object of kind '{}'",
                unknown
            ))),
        }
    }
}

fn malformed(tag: &str, message: &str) -> CodecError {
    CodecError::MalformedReference(format!("invalid '{}' record: {}", tag, message))
}

fn field<'a>(payload: &'a Json, name: &str, tag: &str) -> Result<&'a Json, CodecError> {
    payload
        .get(name)
        .ok_or_else(|| malformed(tag, &format!("missing field '{}'", name)))
}

fn expect_str<'a>(value: &'a Json, tag: &str) -> Result<&'a str, CodecError> {
    value
        .as_str()
        .ok_or_else(|| malformed(tag, &format!("expected a string, found {}", value)))
}

fn bound_to_json(bound: f64) -> Json {
    match Number::from_f64(bound) {
        Some(number) => Json::Number(number),
        None if bound.is_nan() => Json::String("NaN".into()),
        None if bound > 0.0 => Json::String("Infinity".into()),
        None => Json::String("-Infinity".into()),
    }
}

fn bound_from_json(value: &Json) -> Result<f64, CodecError> {
    match value {
        Json::Number(n) => n
            .as_f64()
            .ok_or_else(|| malformed(DISTRIBUTION_TAG, &format!("bound {} is not a float", n))),
        Json::String(s) if s == "Infinity" => Ok(f64::INFINITY),
        Json::String(s) if s == "-Infinity" => Ok(f64::NEG_INFINITY),
        Json::String(s) if s == "NaN" => Ok(f64::NAN),
        other => Err(malformed(DISTRIBUTION_TAG, &format!("invalid bound {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn infinite_bounds_travel_as_strings() {
        let record = SpecialObject::Distribution(DistributionRecord {
            dist: "learnkit.stats.norm".into(),
            a: f64::NEG_INFINITY,
            b: f64::INFINITY,
            args: vec![],
            kwds: IndexMap::new(),
        });
        let json = record.to_json().unwrap();
        assert_eq!(json[VALUE_KEY]["a"], json!("-Infinity"));
        assert_eq!(json[VALUE_KEY]["b"], json!("Infinity"));

        let parsed = SpecialObject::from_tagged("rv_frozen", &json[VALUE_KEY]).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn component_reference_without_argument_omits_the_field() {
        let reference = SpecialObject::ComponentReference(ComponentReference::single("estimator"));
        let json = reference.to_json().unwrap();
        assert_eq!(
            json,
            json!({
                "oml-python:serialized_object": "component_reference",
                "value": {"key": "estimator", "step_name": null}
            })
        );
    }

    #[test]
    fn component_reference_carries_its_argument() {
        let columns = Serialized::List(vec![Serialized::Int(0), Serialized::Int(1)]);
        let reference = SpecialObject::ComponentReference(ComponentReference::step("scale", Some(columns)));
        let json = reference.to_json().unwrap();
        assert_eq!(json[VALUE_KEY]["argument_1"], json!([0, 1]));

        let parsed = SpecialObject::from_tagged("component_reference", &json[VALUE_KEY]).unwrap();
        assert_eq!(parsed, reference);
    }

    #[test]
    fn unknown_tag_is_malformed() {
        let result = SpecialObject::from_tagged("pickle", &json!("payload"));
        assert!(matches!(result, Err(CodecError::MalformedReference(_))));
    }
}
