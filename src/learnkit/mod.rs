//! `learnkit`: the built-in model family.
//!
//! A small set of estimators, splitters, distributions and scorers that is
//! registered into every [`crate::codec::Codec`] built with
//! [`crate::codec::CodecBuilder::new`]. They cover each shape the codec has to
//! handle: plain hyper-parameters, type parameters, single nested models,
//! 2-tuple and 3-tuple step sequences, search models with distributions,
//! functions and splitters.

use crate::error::ModelError;
use crate::estimator::Estimator;
use crate::registry::{DefaultFactory, DefaultSplitterFactory, Registry};
use crate::special::{CrossValidator, Function, ScalarType};
use crate::value::Value;
use std::sync::Arc;

pub mod compose;
pub mod ensemble;
pub mod linear_model;
pub mod metrics;
pub mod model_selection;
pub mod pipeline;
pub mod preprocessing;
pub mod stats;

/// Package name every `learnkit` class name starts with.
pub const FAMILY: &str = "learnkit";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Conversion between a typed constructor parameter and a runtime [`Value`].
pub(crate) trait ParamValue: Sized {
    const EXPECTED: &'static str;

    fn to_value(&self) -> Value;

    /// Returns the rejected value when it has the wrong shape.
    fn from_value(value: Value) -> Result<Self, Value>;
}

impl ParamValue for f64 {
    const EXPECTED: &'static str = "a number";

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        value.as_f64().ok_or(value)
    }
}

impl ParamValue for i64 {
    const EXPECTED: &'static str = "an integer";

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        value.as_i64().ok_or(value)
    }
}

impl ParamValue for usize {
    const EXPECTED: &'static str = "a non-negative integer";

    fn to_value(&self) -> Value {
        Value::Int(*self as i64)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value.as_i64().map(usize::try_from) {
            Some(Ok(n)) => Ok(n),
            _ => Err(value),
        }
    }
}

impl ParamValue for bool {
    const EXPECTED: &'static str = "a boolean";

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        value.as_bool().ok_or(value)
    }
}

impl ParamValue for String {
    const EXPECTED: &'static str = "a string";

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl ParamValue for Value {
    const EXPECTED: &'static str = "any value";

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        Ok(value)
    }
}

impl ParamValue for Vec<f64> {
    const EXPECTED: &'static str = "a list of numbers";

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(|w| Value::Float(*w)).collect())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        let numbers = value
            .as_sequence()
            .and_then(|items| items.iter().map(Value::as_f64).collect::<Option<Vec<_>>>());
        numbers.ok_or(value)
    }
}

impl ParamValue for ScalarType {
    const EXPECTED: &'static str = "a type";

    fn to_value(&self) -> Value {
        Value::Type(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Type(t) => Ok(t),
            other => Err(other),
        }
    }
}

impl ParamValue for Function {
    const EXPECTED: &'static str = "a function";

    fn to_value(&self) -> Value {
        Value::Function(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Function(f) => Ok(f),
            other => Err(other),
        }
    }
}

impl ParamValue for Box<dyn Estimator> {
    const EXPECTED: &'static str = "a model";

    fn to_value(&self) -> Value {
        Value::Model(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Model(model) => Ok(model),
            other => Err(other),
        }
    }
}

impl ParamValue for Box<dyn CrossValidator> {
    const EXPECTED: &'static str = "a cross-validator";

    fn to_value(&self) -> Value {
        Value::CrossValidator(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::CrossValidator(cv) => Ok(cv),
            other => Err(other),
        }
    }
}

impl<T: ParamValue> ParamValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, T::to_value)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

pub(crate) fn assign<T: ParamValue>(
    slot: &mut T,
    class_name: &str,
    name: &str,
    value: Value,
) -> Result<(), ModelError> {
    *slot = T::from_value(value).map_err(|found| ModelError::InvalidParameter {
        class_name: class_name.to_string(),
        name: name.to_string(),
        expected: T::EXPECTED,
        found: found.type_name().to_string(),
    })?;
    Ok(())
}

/// Implements `class_name`, `get_params` and `set_param` for a struct whose
/// listed fields are its constructor parameters, in declaration order.
macro_rules! constructor_params {
    ($class_name:expr, [ $( $field:ident ),* $(,)? ]) => {
        fn class_name(&self) -> &str {
            $class_name
        }

        fn get_params(&self) -> $crate::value::Params {
            let mut params = $crate::value::Params::new();
            $(
                params.insert(
                    stringify!($field).to_string(),
                    $crate::learnkit::ParamValue::to_value(&self.$field),
                );
            )*
            params
        }

        fn set_param(
            &mut self,
            name: &str,
            value: $crate::value::Value,
        ) -> Result<(), $crate::error::ModelError> {
            match name {
                $( stringify!($field) => $crate::learnkit::assign(&mut self.$field, $class_name, name, value), )*
                _ => Err($crate::error::ModelError::UnknownParameter {
                    class_name: $class_name.to_string(),
                    name: name.to_string(),
                }),
            }
        }
    };
}

pub(crate) use constructor_params;

/// Registers every class, distribution and function of the family.
macro_rules! define_family {
    (
        estimators: [ $( ($estimator:ty, $required:expr) ),* $(,)? ],
        splitters: [ $( $splitter:ty ),* $(,)? ],
        distributions: [ $( $distribution:expr ),* $(,)? ],
        functions: [ $( ($function_name:expr, $function:path) ),* $(,)? ] $(,)?
    ) => {
        pub fn register_defaults(registry: &mut Registry) {
            $( registry.register_estimator(Box::new(DefaultFactory::<$estimator>::new($required))); )*
            $( registry.register_splitter(Box::new(DefaultSplitterFactory::<$splitter>::new())); )*
            $( registry.register_distribution(Arc::new($distribution)); )*
            $( registry.register_function(Function::new($function_name, $function)); )*
        }
    };
}

define_family! {
    estimators: [
        (pipeline::Pipeline, &["steps"]),
        (compose::ColumnTransformer, &["transformers"]),
        (preprocessing::StandardScaler, &[]),
        (linear_model::Ridge, &[]),
        (linear_model::SgdRegressor, &[]),
        (ensemble::BaggingRegressor, &[]),
        (ensemble::VotingRegressor, &["estimators"]),
        (model_selection::GridSearchCv, &["estimator", "param_grid"]),
        (model_selection::RandomizedSearchCv, &["estimator", "param_distributions"]),
    ],
    splitters: [
        model_selection::KFold,
        model_selection::ShuffleSplit,
    ],
    distributions: [
        stats::Uniform,
        stats::Normal,
        stats::RandInt,
    ],
    functions: [
        (metrics::R2_SCORE, metrics::r2_score),
        (metrics::NEG_MEAN_SQUARED_ERROR, metrics::neg_mean_squared_error),
        (metrics::NEG_MEAN_ABSOLUTE_ERROR, metrics::neg_mean_absolute_error),
    ],
}

/// Mutable models of a step sequence; null steps are skipped.
pub(crate) fn step_models_mut(value: &mut Value) -> Vec<&mut Box<dyn Estimator>> {
    let entries = match value {
        Value::List(entries) | Value::Tuple(entries) => entries,
        _ => return Vec::new(),
    };
    entries
        .iter_mut()
        .filter_map(|entry| match entry {
            Value::List(parts) | Value::Tuple(parts) => match parts.as_mut_slice() {
                [Value::Str(_), Value::Model(model), ..] => Some(model),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

/// Fails unless `value` is a sequence of `(name, model-or-null, ...)` entries
/// with exactly `arity` elements each.
pub(crate) fn check_steps(
    class_name: &str,
    name: &str,
    value: &Value,
    arity: usize,
) -> Result<(), ModelError> {
    let invalid = |found: &Value| ModelError::InvalidParameter {
        class_name: class_name.to_string(),
        name: name.to_string(),
        expected: if arity == 2 {
            "a sequence of (name, model) steps"
        } else {
            "a sequence of (name, model, columns) steps"
        },
        found: found.to_string(),
    };
    let entries = value.as_sequence().ok_or_else(|| invalid(value))?;
    for entry in entries {
        match entry.as_sequence() {
            Some([Value::Str(_), Value::Model(_) | Value::Null, rest @ ..]) if rest.len() + 2 == arity => {}
            _ => return Err(invalid(entry)),
        }
    }
    Ok(())
}

/// Rows of `x` selected by `indices`.
pub(crate) fn take_rows(x: &[Vec<f64>], indices: &[usize]) -> Vec<Vec<f64>> {
    indices.iter().map(|&i| x[i].clone()).collect()
}

pub(crate) fn take(y: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| y[i]).collect()
}

/// Fails unless `x` is a non-empty rectangular matrix with one target per row.
pub(crate) fn check_training_data(x: &[Vec<f64>], y: &[f64]) -> Result<usize, ModelError> {
    let Some(first) = x.first() else {
        return Err(ModelError::InvalidData("no samples".to_string()));
    };
    if x.len() != y.len() {
        return Err(ModelError::InvalidData(format!(
            "{} samples but {} targets",
            x.len(),
            y.len()
        )));
    }
    check_features(x, first.len())?;
    Ok(first.len())
}

pub(crate) fn check_features(x: &[Vec<f64>], n_features: usize) -> Result<(), ModelError> {
    match x.iter().position(|row| row.len() != n_features) {
        Some(row) => Err(ModelError::InvalidData(format!(
            "row {} has {} features, expected {}",
            row,
            x[row].len(),
            n_features
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_params_accept_null() {
        let mut slot: Option<i64> = Some(3);
        assign(&mut slot, "Test", "random_state", Value::Null).unwrap();
        assert_eq!(slot, None);
        assign(&mut slot, "Test", "random_state", Value::Int(7)).unwrap();
        assert_eq!(slot, Some(7));
    }

    #[test]
    fn wrong_shapes_are_reported() {
        let mut slot = 1.0f64;
        let err = assign(&mut slot, "Test", "alpha", Value::Str("big".into())).unwrap_err();
        assert_eq!(
            err,
            ModelError::InvalidParameter {
                class_name: "Test".into(),
                name: "alpha".into(),
                expected: "a number",
                found: "str".into(),
            }
        );
        let mut count = 0usize;
        assert!(assign(&mut count, "Test", "n", Value::Int(-1)).is_err());
    }

    #[test]
    fn registers_the_whole_family() {
        let mut registry = Registry::new();
        register_defaults(&mut registry);
        assert!(registry.estimator("learnkit.pipeline.Pipeline").is_ok());
        assert!(registry.splitter("learnkit.model_selection.KFold").is_ok());
        assert!(registry.distribution("learnkit.stats.uniform").is_some());
        assert!(registry.function("learnkit.metrics.r2_score").is_ok());
    }
}
