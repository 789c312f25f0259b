use crate::error::CodecError;
use crate::flow::Flow;
use crate::special::{SERIALIZED_OBJECT_KEY, SpecialObject, VALUE_KEY};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Number, Value as Json};
use std::io;

/// Wire-safe form of a runtime value.
///
/// Everything except [`Serialized::Flow`] has a JSON representation. Flows
/// only appear transiently while a model is being encoded; the component graph
/// builder replaces them with component references.
#[derive(Debug, Clone, PartialEq)]
pub enum Serialized {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Serialized>),
    /// A fixed-arity sequence. JSON has no tuples, so this becomes a list on the wire.
    Tuple(Vec<Serialized>),
    Map(IndexMap<String, Serialized>),
    Special(SpecialObject),
    Flow(Box<Flow>),
}

impl Serialized {
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Serialized::Null
                | Serialized::Bool(_)
                | Serialized::Int(_)
                | Serialized::Float(_)
                | Serialized::Str(_)
        )
    }

    /// A value that is present but has zero length.
    pub fn is_empty_container(&self) -> bool {
        match self {
            Serialized::Str(s) => s.is_empty(),
            Serialized::List(items) | Serialized::Tuple(items) => items.is_empty(),
            Serialized::Map(entries) => entries.is_empty(),
            _ => false,
        }
    }

    pub fn as_flow(&self) -> Option<&Flow> {
        match self {
            Serialized::Flow(flow) => Some(flow),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Serialized]> {
        match self {
            Serialized::List(items) | Serialized::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<Json, CodecError> {
        Ok(match self {
            Serialized::Null => Json::Null,
            Serialized::Bool(b) => Json::Bool(*b),
            Serialized::Int(i) => Json::Number((*i).into()),
            Serialized::Float(f) => Json::Number(Number::from_f64(*f).ok_or_else(|| {
                CodecError::UnsupportedType {
                    type_name: "float".into(),
                    reason: format!("{} has no JSON representation", f),
                }
            })?),
            Serialized::Str(s) => Json::String(s.clone()),
            Serialized::List(items) | Serialized::Tuple(items) => Json::Array(
                items
                    .iter()
                    .map(Serialized::to_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Serialized::Map(entries) => {
                let mut object = Map::new();
                for (key, value) in entries {
                    object.insert(key.clone(), value.to_json()?);
                }
                Json::Object(object)
            }
            Serialized::Special(special) => special.to_json()?,
            Serialized::Flow(flow) => {
                return Err(CodecError::UnsupportedType {
                    type_name: "flow".into(),
                    reason: format!("'{}' must be registered as a component, not inlined", flow.name),
                });
            }
        })
    }

    /// Encodes to the JSON text stored in a flow's parameter map.
    pub fn to_wire(&self) -> Result<String, CodecError> {
        json_to_wire(&self.to_json()?)
    }

    pub fn from_json(json: &Json) -> Result<Self, CodecError> {
        Ok(match json {
            Json::Null => Serialized::Null,
            Json::Bool(b) => Serialized::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Serialized::Int(i),
                None => Serialized::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Serialized::Str(s.clone()),
            Json::Array(items) => Serialized::List(
                items
                    .iter()
                    .map(Serialized::from_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Json::Object(object) => match object.get(SERIALIZED_OBJECT_KEY) {
                Some(tag) => {
                    let tag = tag.as_str().ok_or_else(|| {
                        CodecError::MalformedReference(format!("serialized object tag {} is not a string", tag))
                    })?;
                    let payload = object.get(VALUE_KEY).ok_or_else(|| {
                        CodecError::MalformedReference(format!("serialized object '{}' has no value", tag))
                    })?;
                    Serialized::Special(SpecialObject::from_tagged(tag, payload)?)
                }
                None => Serialized::Map(
                    object
                        .iter()
                        .map(|(key, value)| Ok((key.clone(), Serialized::from_json(value)?)))
                        .collect::<Result<IndexMap<_, _>, CodecError>>()?,
                ),
            },
        })
    }

    /// Opportunistically parses a wire string. Text that is not valid JSON is
    /// kept as a plain string.
    pub fn from_wire(text: &str) -> Result<Self, CodecError> {
        match serde_json::from_str::<Json>(text) {
            Ok(json) => Serialized::from_json(&json),
            Err(_) => Ok(Serialized::Str(text.to_string())),
        }
    }
}

/// Writes JSON with `", "` and `": "` separators, the layout flows have always
/// been stored with.
pub(crate) fn json_to_wire(json: &Json) -> Result<String, CodecError> {
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, SpacedFormatter);
    json.serialize(&mut serializer)
        .map_err(|e| CodecError::InvalidJson(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| CodecError::InvalidJson(e.to_string()))
}

struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_text_uses_spaced_separators() {
        let mut entries = IndexMap::new();
        entries.insert("b".to_string(), Serialized::List(vec![Serialized::Int(1), Serialized::Null]));
        entries.insert("a".to_string(), Serialized::Bool(true));
        let wire = Serialized::Map(entries).to_wire().unwrap();
        assert_eq!(wire, r#"{"b": [1, null], "a": true}"#);
    }

    #[test]
    fn unparseable_wire_text_stays_a_string() {
        assert_eq!(
            Serialized::from_wire("sqrt").unwrap(),
            Serialized::Str("sqrt".into())
        );
        assert_eq!(
            Serialized::from_wire("\"sqrt\"").unwrap(),
            Serialized::Str("sqrt".into())
        );
        assert_eq!(Serialized::from_wire("0.5").unwrap(), Serialized::Float(0.5));
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        let result = Serialized::Float(f64::INFINITY).to_wire();
        assert!(matches!(result, Err(CodecError::UnsupportedType { .. })));
    }

    #[test]
    fn tuples_become_lists_on_the_wire() {
        let tuple = Serialized::Tuple(vec![Serialized::Str("x".into()), Serialized::Int(2)]);
        let parsed = Serialized::from_wire(&tuple.to_wire().unwrap()).unwrap();
        assert_eq!(
            parsed,
            Serialized::List(vec![Serialized::Str("x".into()), Serialized::Int(2)])
        );
    }
}
