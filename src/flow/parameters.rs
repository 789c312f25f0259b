use crate::codec::{Codec, Serialized};
use crate::error::CodecError;
use crate::estimator::Estimator;
use crate::flow::Flow;
use crate::special::{ComponentReference, SpecialObject};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One row of a run's parameter upload: a value owned by one flow of the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSetting {
    #[serde(rename = "oml:name")]
    pub name: String,
    #[serde(rename = "oml:value")]
    pub value: String,
    #[serde(rename = "oml:component")]
    pub component: u64,
}

/// Walks a registered flow and a live model in lock-step.
pub(crate) struct ParameterExtractor<'a> {
    codec: &'a Codec,
}

impl<'a> ParameterExtractor<'a> {
    pub(crate) fn new(codec: &'a Codec) -> Self {
        Self { codec }
    }

    pub(crate) fn extract(
        &self,
        flow: &Flow,
        model: &dyn Estimator,
    ) -> Result<Vec<ParameterSetting>, CodecError> {
        flow.ensure_identified()?;
        let mut settings = Vec::new();
        self.extract_level(flow, model, &mut settings)?;
        Ok(settings)
    }

    fn extract_level(
        &self,
        flow: &Flow,
        model: &dyn Estimator,
        settings: &mut Vec<ParameterSetting>,
    ) -> Result<(), CodecError> {
        let model_params = model.get_params_deep();
        let model_names: BTreeSet<&str> = model_params
            .keys()
            .map(String::as_str)
            .filter(|name| !name.contains("__"))
            .collect();
        let flow_names: BTreeSet<&str> = flow
            .parameters
            .keys()
            .chain(flow.components.keys())
            .map(String::as_str)
            .collect();
        if flow_names != model_names {
            return Err(CodecError::SchemaMismatch {
                flow_parameters: flow_names.into_iter().map(str::to_string).collect(),
                model_parameters: model_names.into_iter().map(str::to_string).collect(),
            });
        }

        let component = flow
            .flow_id
            .ok_or_else(|| CodecError::MissingIdentity(flow.name.clone()))?;
        for name in flow.parameters.keys() {
            let encoded = self.codec.encode(&model_params[name.as_str()])?;
            // Components are emitted by their own level.
            if matches!(encoded, Serialized::Flow(_)) {
                continue;
            }
            let value = if is_subcomponent_specification(&encoded) {
                component_references(&encoded)?
            } else {
                encoded.to_wire()?
            };
            settings.push(ParameterSetting {
                name: name.clone(),
                value,
                component,
            });
        }

        for (identifier, subflow) in &flow.components {
            let Some(Value::Model(submodel)) = model_params.get(identifier.as_str()) else {
                return Err(CodecError::MalformedReference(format!(
                    "component '{}' of {} is not a model",
                    identifier, flow.name
                )));
            };
            self.extract_level(subflow, submodel.as_ref(), settings)?;
        }
        Ok(())
    }
}

/// A sequence of `(identifier, flow-or-null, ...)` entries holding at least
/// one flow.
fn is_subcomponent_specification(value: &Serialized) -> bool {
    let Some(entries) = value.as_sequence() else {
        return false;
    };
    let mut has_flow = false;
    for entry in entries {
        match entry.as_sequence() {
            Some(parts) if parts.len() >= 2 => match parts[1] {
                Serialized::Flow(_) => has_flow = true,
                Serialized::Null => {}
                _ => return false,
            },
            _ => return false,
        }
    }
    has_flow
}

/// Re-expands a step sequence into one component reference per step.
fn component_references(value: &Serialized) -> Result<String, CodecError> {
    let mut references = Vec::new();
    for entry in value.as_sequence().unwrap_or_default() {
        let parts = entry.as_sequence().unwrap_or_default();
        if !(2..=3).contains(&parts.len()) {
            return Err(CodecError::MalformedReference(format!(
                "component reference should have 2 or 3 elements, found {}",
                parts.len()
            )));
        }
        let Serialized::Str(identifier) = &parts[0] else {
            return Err(CodecError::MalformedReference(
                "subcomponent identifier should be a string".to_string(),
            ));
        };
        if matches!(parts[1], Serialized::Null) {
            references.push(Serialized::List(vec![
                Serialized::Str(identifier.clone()),
                Serialized::Null,
            ]));
            continue;
        }
        let argument = match parts.get(2) {
            Some(list @ Serialized::List(_)) | Some(list @ Serialized::Tuple(_)) => Some(list.clone()),
            Some(other) => {
                return Err(CodecError::MalformedReference(format!(
                    "subcomponent argument should be a list, found {:?}",
                    other
                )));
            }
            None => None,
        };
        references.push(Serialized::Special(SpecialObject::ComponentReference(
            ComponentReference::step(identifier, argument),
        )));
    }
    Serialized::List(references).to_wire()
}
