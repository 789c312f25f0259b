//! Flattening of hyper-parameter search results into run-trace rows.
//!
//! The search results are an ordered-sequence contract: every column holds one
//! cell per iteration, and iteration `i` of one column belongs to iteration
//! `i` of every other column.

use crate::codec::{Codec, json_to_wire};
use crate::error::CodecError;
use crate::value::{Params, Value};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Number, Value as Json};

/// Per-iteration outcome of a fitted hyper-parameter search.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResults {
    /// Mean cross-validated score per iteration.
    pub mean_test_score: Vec<f64>,
    /// Parameter name to one cell per iteration, in the order the search first
    /// encountered each name. `None` marks an iteration that did not set it.
    pub params: IndexMap<String, Vec<Option<Value>>>,
    /// Iteration that was selected as the best one.
    pub best_index: usize,
}

impl SearchResults {
    pub fn n_iterations(&self) -> usize {
        self.mean_test_score.len()
    }

    fn check_shape(&self) -> Result<(), CodecError> {
        let n = self.n_iterations();
        if n > 0 && self.best_index >= n {
            return Err(CodecError::InconsistentSearchResults(format!(
                "best index {} out of {} iterations",
                self.best_index, n
            )));
        }
        if let Some((name, cells)) = self.params.iter().find(|(_, cells)| cells.len() != n) {
            return Err(CodecError::InconsistentSearchResults(format!(
                "column '{}' has {} cells, expected {}",
                name,
                cells.len(),
                n
            )));
        }
        Ok(())
    }
}

/// Column type of a trace attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AttributeType {
    Numeric,
    String,
    Nominal(Vec<String>),
}

pub const PARAMETER_PREFIX: &str = "parameter_";

/// One row of a run trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRow {
    pub repeat: usize,
    pub fold: usize,
    pub iteration: usize,
    pub evaluation: f64,
    pub selected: bool,
    /// Parameter name to its JSON-encoded value; `None` for a masked cell.
    pub parameters: IndexMap<String, Option<String>>,
}

impl TraceRow {
    /// Decodes the parameters of this iteration, skipping masked cells.
    pub fn get_parameters(&self, codec: &Codec) -> Result<Params, CodecError> {
        let mut params = Params::new();
        for (name, wire) in &self.parameters {
            if let Some(wire) = wire {
                params.insert(name.clone(), codec.decode_wire(wire)?);
            }
        }
        Ok(params)
    }

    /// The row as it is uploaded: fixed columns followed by the parameters.
    pub fn to_json(&self) -> Json {
        let mut row = vec![
            Json::from(self.repeat),
            Json::from(self.fold),
            Json::from(self.iteration),
            Number::from_f64(self.evaluation).map_or(Json::Null, Json::Number),
            Json::from(if self.selected { "true" } else { "false" }),
        ];
        row.extend(
            self.parameters
                .values()
                .map(|wire| wire.clone().map_or(Json::Null, Json::String)),
        );
        Json::Array(row)
    }
}

/// The column schema of the trace produced by [`extract_trace_data`].
pub fn trace_attributes(results: &SearchResults) -> Result<Vec<(String, AttributeType)>, CodecError> {
    results.check_shape()?;
    let mut attributes = vec![
        ("repeat".to_string(), AttributeType::Numeric),
        ("fold".to_string(), AttributeType::Numeric),
        ("iteration".to_string(), AttributeType::Numeric),
        ("evaluation".to_string(), AttributeType::Numeric),
        (
            "selected".to_string(),
            AttributeType::Nominal(vec!["true".to_string(), "false".to_string()]),
        ),
    ];
    for (name, cells) in &results.params {
        for cell in cells.iter().flatten() {
            if !is_trace_value(cell) {
                return Err(CodecError::UnsupportedType {
                    type_name: cell.type_name().to_string(),
                    reason: format!("parameter '{}' cannot be part of a trace", name),
                });
            }
        }
        attributes.push((format!("{}{}", PARAMETER_PREFIX, name), AttributeType::String));
    }
    Ok(attributes)
}

/// One row per search iteration for the given repeat and fold.
pub fn extract_trace_data(
    results: &SearchResults,
    repeat: usize,
    fold: usize,
) -> Result<Vec<TraceRow>, CodecError> {
    results.check_shape()?;
    let mut rows = Vec::with_capacity(results.n_iterations());
    for (iteration, evaluation) in results.mean_test_score.iter().enumerate() {
        let mut parameters = IndexMap::with_capacity(results.params.len());
        for (name, cells) in &results.params {
            let wire = match &cells[iteration] {
                Some(value) => Some(trace_value_to_wire(name, value)?),
                None => None,
            };
            parameters.insert(name.clone(), wire);
        }
        rows.push(TraceRow {
            repeat,
            fold,
            iteration,
            evaluation: *evaluation,
            selected: iteration == results.best_index,
            parameters,
        });
    }
    Ok(rows)
}

fn is_trace_value(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_) => true,
        Value::Scalar(_) => true,
        Value::List(items) => items.iter().all(|item| item.as_i64().is_some()),
        _ => false,
    }
}

fn trace_value_to_wire(name: &str, value: &Value) -> Result<String, CodecError> {
    let unsupported = || CodecError::UnsupportedType {
        type_name: value.type_name().to_string(),
        reason: format!("parameter '{}' cannot be part of a trace", name),
    };
    let json = match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Str(s) => Json::String(s.clone()),
        Value::List(items) => Json::Array(
            items
                .iter()
                .map(|item| item.as_i64().map(Json::from).ok_or_else(unsupported))
                .collect::<Result<_, _>>()?,
        ),
        other => match other.as_i64() {
            Some(i) => Json::from(i),
            None => other
                .as_f64()
                .and_then(Number::from_f64)
                .map(Json::Number)
                .ok_or_else(unsupported)?,
        },
    };
    json_to_wire(&json)
}
