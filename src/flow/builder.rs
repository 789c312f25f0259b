use crate::codec::{Codec, Serialized};
use crate::error::CodecError;
use crate::estimator::Estimator;
use crate::flow::{Flow, ParameterMetaInfo};
use crate::special::{ComponentReference, SpecialObject};
use crate::value::Params;
use ahash::AHashSet;
use indexmap::IndexMap;
use tracing::debug;

/// Everything the assembler needs to know about one model.
pub(crate) struct ExtractedModel {
    pub parameters: IndexMap<String, Option<String>>,
    pub parameters_meta_info: IndexMap<String, ParameterMetaInfo>,
    pub components: IndexMap<String, Flow>,
    /// Component keys that appear as `key=Name` in the flow name.
    pub explicit: AHashSet<String>,
}

/// Splits a model's own parameters into wire-encoded hyper-parameters and
/// component flows.
pub(crate) struct ComponentGraphBuilder<'a> {
    codec: &'a Codec,
    model: &'a dyn Estimator,
    depth: usize,
    extracted: ExtractedModel,
}

impl<'a> ComponentGraphBuilder<'a> {
    pub(crate) fn new(codec: &'a Codec, model: &'a dyn Estimator, depth: usize) -> Self {
        Self {
            codec,
            model,
            depth,
            extracted: ExtractedModel {
                parameters: IndexMap::new(),
                parameters_meta_info: IndexMap::new(),
                components: IndexMap::new(),
                explicit: AHashSet::new(),
            },
        }
    }

    pub(crate) fn extract(mut self) -> Result<ExtractedModel, CodecError> {
        let own = self.model.get_params();
        let mut names: Vec<&String> = own.keys().collect();
        names.sort();

        for name in names {
            debug!(depth = self.depth, parameter = %name, "extracting parameter");
            let encoded = self.codec.encode_at(&own[name.as_str()], self.depth + 1)?;

            let wire = match encoded {
                ref steps if is_step_sequence(steps) => Some(self.register_steps(name, steps, &own)?),
                Serialized::Flow(flow) => {
                    self.extracted.components.insert(name.clone(), *flow);
                    self.extracted.explicit.insert(name.clone());
                    let reference = ComponentReference::single(name);
                    Some(Serialized::Special(SpecialObject::ComponentReference(reference)).to_wire()?)
                }
                ref empty if empty.is_empty_container() => None,
                other => Some(other.to_wire()?),
            };

            self.extracted.parameters.insert(name.clone(), wire);
            self.extracted
                .parameters_meta_info
                .insert(name.clone(), ParameterMetaInfo::default());
        }
        Ok(self.extracted)
    }

    /// Replaces every present sub-model of a step sequence with a component
    /// reference and returns the rewritten sequence as wire text.
    fn register_steps(
        &mut self,
        parameter: &str,
        encoded: &Serialized,
        own: &Params,
    ) -> Result<String, CodecError> {
        let class_name = self.model.class_name();
        let malformed = |message: String| CodecError::MalformedStep {
            model: class_name.to_string(),
            parameter: parameter.to_string(),
            message,
        };

        let steps = encoded.as_sequence().unwrap_or_default();
        let mut rewritten = Vec::with_capacity(steps.len());
        for step in steps {
            let parts = step.as_sequence().unwrap_or_default();
            if !(2..=3).contains(&parts.len()) {
                return Err(malformed(format!(
                    "expected (identifier, model[, argument]), found {} elements",
                    parts.len()
                )));
            }
            let Serialized::Str(identifier) = &parts[0] else {
                return Err(malformed(format!("step identifier must be a string, found {:?}", parts[0])));
            };
            if !matches!(parts[1], Serialized::Flow(_) | Serialized::Null) {
                return Err(malformed(format!(
                    "step '{}' must hold a model or null, found {:?}",
                    identifier, parts[1]
                )));
            }
            if own.contains_key(identifier.as_str()) {
                return Err(CodecError::ShadowedParameter {
                    model: class_name.to_string(),
                    identifier: identifier.clone(),
                });
            }

            let entry = match &parts[1] {
                Serialized::Flow(flow) => {
                    if self.extracted.components.contains_key(identifier.as_str()) {
                        return Err(malformed(format!("step identifier '{}' is used twice", identifier)));
                    }
                    self.extracted
                        .components
                        .insert(identifier.clone(), flow.as_ref().clone());
                    self.extracted.explicit.insert(identifier.clone());
                    Serialized::Special(SpecialObject::ComponentReference(ComponentReference::step(
                        identifier,
                        parts.get(2).cloned(),
                    )))
                }
                _ => {
                    let disabled = vec![Serialized::Str(identifier.clone()), Serialized::Null];
                    match step {
                        Serialized::Tuple(_) => Serialized::Tuple(disabled),
                        _ => Serialized::List(disabled),
                    }
                }
            };
            rewritten.push(entry);
        }

        match encoded {
            Serialized::Tuple(_) => Serialized::Tuple(rewritten),
            _ => Serialized::List(rewritten),
        }
        .to_wire()
    }
}

/// A non-empty sequence of same-kind sequences with at least one leaf that is
/// not a primitive. Pipeline steps look like this; nested lists of numbers
/// or strings do not.
pub(crate) fn is_step_sequence(value: &Serialized) -> bool {
    let Some(entries) = value.as_sequence() else {
        return false;
    };
    let Some(first) = entries.first() else {
        return false;
    };
    let same_kind = entries.iter().all(|entry| {
        matches!(
            (first, entry),
            (Serialized::List(_), Serialized::List(_)) | (Serialized::Tuple(_), Serialized::Tuple(_))
        )
    });
    same_kind && !all_leaves_primitive(value)
}

fn all_leaves_primitive(value: &Serialized) -> bool {
    match value.as_sequence() {
        Some(items) => items.iter().all(all_leaves_primitive),
        None => value.is_primitive(),
    }
}

/// Rejects component graphs in which the same flow name is reachable twice.
pub(crate) fn check_duplicate_components(
    model: &dyn Estimator,
    components: &IndexMap<String, Flow>,
) -> Result<(), CodecError> {
    let mut to_visit: Vec<&Flow> = components.values().collect();
    let mut known: AHashSet<&str> = AHashSet::new();
    while let Some(visitee) = to_visit.pop() {
        if !known.insert(visitee.name.as_str()) {
            return Err(CodecError::DuplicateComponent {
                component: visitee.name.clone(),
                model: model.class_name().to_string(),
            });
        }
        to_visit.extend(visitee.components.values());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Serialized {
        Serialized::Str(text.to_string())
    }

    #[test]
    fn nested_lists_of_primitives_are_plain_values() {
        let categories = Serialized::List(vec![
            Serialized::List(vec![Serialized::Int(0), Serialized::Int(1)]),
            Serialized::List(vec![s("a"), Serialized::Null]),
        ]);
        assert!(!is_step_sequence(&categories));
    }

    #[test]
    fn mixed_sequence_kinds_are_not_steps() {
        let mixed = Serialized::List(vec![
            Serialized::Tuple(vec![s("a"), Serialized::Map(IndexMap::new())]),
            Serialized::List(vec![s("b"), Serialized::Map(IndexMap::new())]),
        ]);
        assert!(!is_step_sequence(&mixed));
        assert!(!is_step_sequence(&Serialized::List(vec![])));
    }

    #[test]
    fn a_non_primitive_leaf_marks_a_step_sequence() {
        let steps = Serialized::List(vec![Serialized::Tuple(vec![
            s("scale"),
            Serialized::Map(IndexMap::new()),
        ])]);
        assert!(is_step_sequence(&steps));
    }
}
