use crate::error::ModelError;
use crate::trace::SearchResults;
use crate::value::{Params, Value};
use std::fmt::Debug;

/// The capability set every model object exposes: introspectable parameters,
/// parameter assignment and training.
///
/// `get_params` returns only the model's own constructor parameters. The
/// provided [`Estimator::get_params_deep`] adds the `outer__inner` names of
/// nested models and the names of pipeline-like steps.
pub trait Estimator: Debug + Send + Sync {
    /// Fully qualified class name, e.g. `learnkit.linear_model.Ridge`.
    fn class_name(&self) -> &str;

    fn get_params(&self) -> Params;

    fn set_param(&mut self, name: &str, value: Value) -> Result<(), ModelError>;

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError>;

    fn predict(&self, _x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        Err(ModelError::NotAPredictor(self.class_name().to_string()))
    }

    fn transform(&self, _x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ModelError> {
        Err(ModelError::NotATransformer(self.class_name().to_string()))
    }

    /// Downcast hook for hyper-parameter search models.
    fn as_search(&self) -> Option<&dyn HyperparameterSearch> {
        None
    }

    fn clone_box(&self) -> Box<dyn Estimator>;

    fn get_params_deep(&self) -> Params {
        let own = self.get_params();
        let mut steps = Params::new();
        let mut nested = Vec::new();
        for (name, value) in &own {
            if let Value::Model(model) = value {
                nested.extend(
                    model
                        .get_params_deep()
                        .into_iter()
                        .map(|(inner, v)| (format!("{}__{}", name, inner), v)),
                );
                continue;
            }
            for (step_name, step) in named_steps(value) {
                steps.insert(step_name.to_string(), Value::Model(step.clone_box()));
                nested.extend(
                    step.get_params_deep()
                        .into_iter()
                        .map(|(inner, v)| (format!("{}__{}", step_name, inner), v)),
                );
            }
        }
        nested.sort_by(|a, b| a.0.cmp(&b.0));
        own.into_iter().chain(steps).chain(nested).collect()
    }

    /// Assigns parameters by (possibly nested) name.
    ///
    /// `outer__inner` is routed to the nested model or step called `outer`; a
    /// bare step name replaces that step's model.
    fn set_params(&mut self, params: Params) -> Result<(), ModelError> {
        for (name, value) in params {
            let own = self.get_params();
            match name.split_once("__") {
                None if own.contains_key(&name) => self.set_param(&name, value)?,
                None => {
                    let (owner, updated) = replace_step(&own, &name, |_| Ok(value))
                        .ok_or_else(|| ModelError::UnknownParameter {
                            class_name: self.class_name().to_string(),
                            name: name.clone(),
                        })??;
                    self.set_param(&owner, updated)?;
                }
                Some((head, rest)) => {
                    let mut nested = Params::new();
                    nested.insert(rest.to_string(), value);
                    if let Some(Value::Model(model)) = own.get(head) {
                        let mut model = model.clone();
                        model.set_params(nested)?;
                        self.set_param(head, Value::Model(model))?;
                        continue;
                    }
                    let (owner, updated) = replace_step(&own, head, |current| match current {
                        Value::Model(model) => {
                            let mut model = model.clone();
                            model.set_params(nested)?;
                            Ok(Value::Model(model))
                        }
                        _ => Err(ModelError::UnknownParameter {
                            class_name: head.to_string(),
                            name: rest.to_string(),
                        }),
                    })
                    .ok_or_else(|| ModelError::UnknownParameter {
                        class_name: self.class_name().to_string(),
                        name: name.clone(),
                    })??;
                    self.set_param(&owner, updated)?;
                }
            }
        }
        Ok(())
    }
}

impl Clone for Box<dyn Estimator> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Models that tune a wrapped estimator over a search space.
pub trait HyperparameterSearch {
    /// The estimator being tuned, as configured (not refitted).
    fn estimator(&self) -> &dyn Estimator;

    /// The parameter grid or the parameter distributions.
    fn search_space(&self) -> &Value;

    /// Per-iteration results, available after fitting.
    fn search_results(&self) -> Option<&SearchResults>;
}

/// Whether a value carries the estimator capability set.
pub fn is_estimator(value: &Value) -> bool {
    matches!(value, Value::Model(_))
}

/// Yields the `(name, model)` pairs of a step sequence; null steps are skipped.
pub(crate) fn named_steps(value: &Value) -> Vec<(&str, &dyn Estimator)> {
    let Some(entries) = value.as_sequence() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match entry.as_sequence()? {
            [Value::Str(name), Value::Model(model), ..] => Some((name.as_str(), model.as_ref())),
            _ => None,
        })
        .collect()
}

/// Rebuilds the step sequence that contains `step` with the step's model
/// replaced. Returns the owning parameter name and its new value.
fn replace_step(
    params: &Params,
    step: &str,
    replace: impl FnOnce(&Value) -> Result<Value, ModelError>,
) -> Option<Result<(String, Value), ModelError>> {
    for (owner, value) in params {
        let (entries, is_tuple) = match value {
            Value::List(entries) => (entries, false),
            Value::Tuple(entries) => (entries, true),
            _ => continue,
        };
        let position = entries.iter().position(|entry| {
            matches!(entry.as_sequence(), Some([Value::Str(name), _, ..]) if name == step)
        });
        let Some(position) = position else {
            continue;
        };

        let mut entries = entries.clone();
        if let Value::List(parts) | Value::Tuple(parts) = &mut entries[position] {
            match replace(&parts[1]) {
                Ok(new) => parts[1] = new,
                Err(e) => return Some(Err(e)),
            }
        }
        let rebuilt = if is_tuple {
            Value::Tuple(entries)
        } else {
            Value::List(entries)
        };
        return Some(Ok((owner.clone(), rebuilt)));
    }
    None
}
