use crate::codec::{Codec, Serialized};
use crate::error::CodecError;
use crate::estimator::Estimator;
use crate::flow::Flow;
use crate::special::{ComponentReference, FrozenDistribution, ScalarType, SpecialObject};
use crate::special::{CrossValidatorRecord, DistributionRecord};
use crate::value::{Params, Value};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

/// The components of one flow that have not been placed yet.
///
/// Each component can be taken exactly once; a second reference to the same
/// key is an error rather than a shared instance.
pub(crate) struct ComponentPool<'f> {
    available: IndexMap<&'f str, &'f Flow>,
    consumed: Vec<&'f str>,
}

impl<'f> ComponentPool<'f> {
    pub(crate) fn new(components: &'f IndexMap<String, Flow>) -> Self {
        Self {
            available: components
                .iter()
                .map(|(key, flow)| (key.as_str(), flow))
                .collect(),
            consumed: Vec::new(),
        }
    }

    pub(crate) fn take(&mut self, key: &str) -> Result<&'f Flow, CodecError> {
        match self.available.shift_remove_entry(key) {
            Some((key, flow)) => {
                self.consumed.push(key);
                Ok(flow)
            }
            None if self.consumed.iter().any(|consumed| *consumed == key) => {
                Err(CodecError::MalformedReference(format!(
                    "component '{}' is referenced more than once",
                    key
                )))
            }
            None => Err(CodecError::MalformedReference(format!(
                "component '{}' is not part of the flow",
                key
            ))),
        }
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.available.contains_key(key)
    }
}

/// Turns serialized values and flows back into runtime values and models.
pub(crate) struct Decoder<'c> {
    codec: &'c Codec,
    keep_defaults: bool,
}

impl<'c> Decoder<'c> {
    pub(crate) fn new(codec: &'c Codec, keep_defaults: bool) -> Self {
        Self {
            codec,
            keep_defaults,
        }
    }

    pub(crate) fn decode(
        &self,
        value: &Serialized,
        mut pool: Option<&mut ComponentPool<'_>>,
        depth: usize,
    ) -> Result<Value, CodecError> {
        Ok(match value {
            Serialized::Null => Value::Null,
            Serialized::Bool(b) => Value::Bool(*b),
            Serialized::Int(i) => Value::Int(*i),
            Serialized::Float(f) => Value::Float(*f),
            Serialized::Str(s) => Value::Str(s.clone()),
            Serialized::List(items) if items.iter().any(is_step_reference) => {
                Value::List(self.decode_steps(items, pool, depth)?)
            }
            Serialized::List(items) => Value::List(self.decode_all(items, pool, depth)?),
            Serialized::Tuple(items) => Value::Tuple(self.decode_all(items, pool, depth)?),
            Serialized::Map(entries) => {
                let mut decoded = Vec::with_capacity(entries.len());
                for (key, item) in entries {
                    let item = self.decode(item, pool.as_deref_mut(), depth + 1)?;
                    decoded.push((Value::Str(key.clone()), item));
                }
                Value::OrderedDict(decoded)
            }
            Serialized::Special(special) => self.decode_special(special, pool, depth)?,
            Serialized::Flow(flow) => Value::Model(self.decode_flow(flow, depth + 1)?),
        })
    }

    fn decode_all(
        &self,
        items: &[Serialized],
        mut pool: Option<&mut ComponentPool<'_>>,
        depth: usize,
    ) -> Result<Vec<Value>, CodecError> {
        let mut decoded = Vec::with_capacity(items.len());
        for item in items {
            decoded.push(self.decode(item, pool.as_deref_mut(), depth + 1)?);
        }
        Ok(decoded)
    }

    /// Decodes a step sequence. Referenced steps come back as tuples, so the
    /// disabled `[identifier, null]` entries beside them are turned into
    /// tuples too.
    fn decode_steps(
        &self,
        items: &[Serialized],
        mut pool: Option<&mut ComponentPool<'_>>,
        depth: usize,
    ) -> Result<Vec<Value>, CodecError> {
        let mut decoded = Vec::with_capacity(items.len());
        for item in items {
            let step = match item.as_sequence() {
                Some([Serialized::Str(identifier), Serialized::Null]) => {
                    Value::Tuple(vec![Value::Str(identifier.clone()), Value::Null])
                }
                _ => self.decode(item, pool.as_deref_mut(), depth + 1)?,
            };
            decoded.push(step);
        }
        Ok(decoded)
    }

    fn decode_special(
        &self,
        special: &SpecialObject,
        pool: Option<&mut ComponentPool<'_>>,
        depth: usize,
    ) -> Result<Value, CodecError> {
        match special {
            SpecialObject::Type(name) => Ok(Value::Type(ScalarType::from_wire_name(name)?)),
            SpecialObject::Function(name) => Ok(Value::Function(self.codec.registry().function(name)?)),
            SpecialObject::Distribution(record) => self.decode_distribution(record, depth),
            SpecialObject::CrossValidator(record) => self.decode_cross_validator(record, depth),
            SpecialObject::ComponentReference(reference) => {
                let pool = pool.ok_or_else(|| {
                    CodecError::MalformedReference(format!(
                        "component reference '{}' outside of a flow",
                        reference.key
                    ))
                })?;
                self.resolve_reference(reference, pool, depth)
            }
        }
    }

    fn resolve_reference(
        &self,
        reference: &ComponentReference,
        pool: &mut ComponentPool<'_>,
        depth: usize,
    ) -> Result<Value, CodecError> {
        debug!(depth, key = %reference.key, "resolving component reference");
        let flow = pool.take(&reference.key)?;
        let component = Value::Model(self.decode_flow(flow, depth + 1)?);

        let Some(step_name) = &reference.step_name else {
            return Ok(component);
        };
        let mut step = vec![Value::Str(step_name.clone()), component];
        if let Some(argument) = &reference.argument_1 {
            step.push(self.decode(argument, None, depth + 1)?);
        }
        Ok(Value::Tuple(step))
    }

    fn decode_distribution(&self, record: &DistributionRecord, depth: usize) -> Result<Value, CodecError> {
        let Some(family) = self.codec.registry().distribution(&record.dist) else {
            warn!(dist = %record.dist, "cannot resolve distribution; decoding it as null");
            return Ok(Value::Null);
        };
        let args = self.decode_all(&record.args, None, depth)?;
        let mut kwds = Params::new();
        for (name, value) in &record.kwds {
            kwds.insert(name.clone(), self.decode(value, None, depth + 1)?);
        }
        let frozen = FrozenDistribution::freeze(family, args, kwds).with_bounds(record.a, record.b);
        Ok(Value::Distribution(frozen))
    }

    fn decode_cross_validator(
        &self,
        record: &CrossValidatorRecord,
        depth: usize,
    ) -> Result<Value, CodecError> {
        debug!(depth, class = %record.name, "decoding cross-validator");
        let factory = self.codec.registry().splitter(&record.name)?;
        let mut params = Params::new();
        for (name, wire) in &record.parameters {
            let value = match wire {
                Some(text) => self.decode(&Serialized::from_wire(text)?, None, depth + 1)?,
                None => Value::Null,
            };
            params.insert(name.clone(), value);
        }
        Ok(Value::CrossValidator(factory.build(params)?))
    }

    /// Reconstructs a model, provided the flow belongs to this codec's family.
    pub(crate) fn decode_flow(&self, flow: &Flow, depth: usize) -> Result<Box<dyn Estimator>, CodecError> {
        let family = &self.codec.config().family;
        let marker = format!("{}==", family);
        let compatible = flow.external_version.starts_with(&marker)
            || flow.external_version.contains(&format!(",{}", marker));
        if !compatible {
            return Err(CodecError::VersionIncompatible {
                family: family.clone(),
                external_version: flow.external_version.clone(),
            });
        }
        self.deserialize_model(flow, depth)
    }

    fn deserialize_model(&self, flow: &Flow, depth: usize) -> Result<Box<dyn Estimator>, CodecError> {
        info!(depth, flow = %flow.name, "reconstructing model");
        self.codec.check_dependencies(&flow.dependencies)?;

        let mut pool = ComponentPool::new(&flow.components);
        let mut params = Params::new();
        for (name, wire) in &flow.parameters {
            debug!(depth, parameter = %name, "decoding parameter");
            let value = match wire {
                Some(text) => self.decode(&Serialized::from_wire(text)?, Some(&mut pool), depth + 1)?,
                None => Value::Null,
            };
            params.insert(name.clone(), value);
        }

        for name in flow.components.keys() {
            if params.contains_key(name) || !pool.contains(name) {
                continue;
            }
            debug!(depth, component = %name, "decoding unreferenced component");
            let component = pool.take(name)?;
            params.insert(name.clone(), Value::Model(self.decode_flow(component, depth + 1)?));
        }

        let factory = self.codec.registry().estimator(&flow.class_name)?;
        if self.keep_defaults {
            for name in factory.defaults().keys() {
                if !flow.components.contains_key(name) {
                    params.shift_remove(name);
                }
            }
        }
        Ok(factory.build(params)?)
    }
}

fn is_step_reference(item: &Serialized) -> bool {
    matches!(
        item,
        Serialized::Special(SpecialObject::ComponentReference(ComponentReference {
            step_name: Some(_),
            ..
        }))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flows() -> IndexMap<String, Flow> {
        let flow = Flow::from_json(
            r#"{"flow_id": null, "name": "learnkit.linear_model.Ridge",
                "class_name": "learnkit.linear_model.Ridge", "description": "",
                "parameters": {}, "parameters_meta_info": {}, "components": {},
                "external_version": "", "dependencies": "", "tags": [], "language": "English"}"#,
        )
        .unwrap();
        let mut components = IndexMap::new();
        components.insert("ridge".to_string(), flow);
        components
    }

    #[test]
    fn pool_hands_out_each_component_once() {
        let components = flows();
        let mut pool = ComponentPool::new(&components);
        assert!(pool.contains("ridge"));
        assert!(pool.take("ridge").is_ok());
        assert!(!pool.contains("ridge"));

        match pool.take("ridge") {
            Err(CodecError::MalformedReference(message)) => assert!(message.contains("more than once")),
            other => panic!("expected MalformedReference, got {:?}", other.map(|f| f.name.clone())),
        }
        match pool.take("lasso") {
            Err(CodecError::MalformedReference(message)) => assert!(message.contains("not part")),
            other => panic!("expected MalformedReference, got {:?}", other.map(|f| f.name.clone())),
        }
    }
}
