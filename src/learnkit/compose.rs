use crate::error::ModelError;
use crate::estimator::Estimator;
use crate::learnkit::{check_features, check_steps, check_training_data, constructor_params};
use crate::value::Value;

const DROP: &str = "drop";
const PASSTHROUGH: &str = "passthrough";

/// Applies one transformer per column subset and concatenates the results.
///
/// `transformers` is a list of `(name, model, columns)` tuples; `columns` is a
/// list of feature indices. A null model drops its columns. Columns no
/// transformer claims are dropped or passed through according to `remainder`.
#[derive(Debug, Clone)]
pub struct ColumnTransformer {
    transformers: Value,
    remainder: String,
    n_features: Option<usize>,
}

impl Default for ColumnTransformer {
    fn default() -> Self {
        Self {
            transformers: Value::List(Vec::new()),
            remainder: DROP.to_string(),
            n_features: None,
        }
    }
}

impl ColumnTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a `(name, model, columns)` entry.
    pub fn transformer(mut self, name: &str, model: impl Estimator + 'static, columns: &[usize]) -> Self {
        let entry = Value::Tuple(vec![
            Value::Str(name.to_string()),
            Value::model(model),
            Value::List(columns.iter().map(|&c| Value::Int(c as i64)).collect()),
        ]);
        if let Value::List(entries) | Value::Tuple(entries) = &mut self.transformers {
            entries.push(entry);
        }
        self
    }

    pub fn remainder(mut self, remainder: &str) -> Self {
        self.remainder = remainder.to_string();
        self
    }

    fn columns(&self, columns: &Value, n_features: usize) -> Result<Vec<usize>, ModelError> {
        let invalid = || ModelError::InvalidParameter {
            class_name: self.class_name().to_string(),
            name: "transformers".to_string(),
            expected: "a list of column indices",
            found: columns.to_string(),
        };
        columns
            .as_sequence()
            .ok_or_else(invalid)?
            .iter()
            .map(|c| match c.as_i64().map(usize::try_from) {
                Some(Ok(c)) if c < n_features => Ok(c),
                _ => Err(invalid()),
            })
            .collect()
    }

    /// `(model, columns)` of every transformer, nulls included as `None`.
    fn entries(&self, n_features: usize) -> Result<Vec<(Option<&dyn Estimator>, Vec<usize>)>, ModelError> {
        let mut entries = Vec::new();
        for entry in self.transformers.as_sequence().unwrap_or_default() {
            if let Some([_, model, columns]) = entry.as_sequence() {
                entries.push((model.as_model(), self.columns(columns, n_features)?));
            }
        }
        Ok(entries)
    }
}

fn select(row: &[f64], columns: &[usize]) -> Vec<f64> {
    columns.iter().map(|&c| row[c]).collect()
}

impl Estimator for ColumnTransformer {
    constructor_params!("learnkit.compose.ColumnTransformer", [transformers, remainder]);

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        check_steps(self.class_name(), "transformers", &self.transformers, 3)?;
        if self.remainder != DROP && self.remainder != PASSTHROUGH {
            return Err(ModelError::InvalidParameter {
                class_name: self.class_name().to_string(),
                name: "remainder".to_string(),
                expected: "'drop' or 'passthrough'",
                found: self.remainder.clone(),
            });
        }
        let n_features = check_training_data(x, y)?;

        let mut fitted = Vec::new();
        for (model, columns) in self.entries(n_features)? {
            fitted.push(match model {
                Some(model) => {
                    let subset: Vec<Vec<f64>> = x.iter().map(|row| select(row, &columns)).collect();
                    let mut model = model.clone_box();
                    model.fit(&subset, y)?;
                    Some(model)
                }
                None => None,
            });
        }

        let mut slots = fitted.into_iter();
        if let Value::List(entries) | Value::Tuple(entries) = &mut self.transformers {
            for entry in entries.iter_mut() {
                if let Value::List(parts) | Value::Tuple(parts) = entry {
                    if let Some(Some(model)) = slots.next() {
                        parts[1] = Value::Model(model);
                    }
                }
            }
        }
        self.n_features = Some(n_features);
        Ok(())
    }

    fn transform(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ModelError> {
        let n_features = self
            .n_features
            .ok_or_else(|| ModelError::NotFitted(self.class_name().to_string()))?;
        check_features(x, n_features)?;

        let entries = self.entries(n_features)?;
        let mut out: Vec<Vec<f64>> = vec![Vec::new(); x.len()];
        let mut claimed = vec![false; n_features];
        for (model, columns) in &entries {
            for &c in columns {
                claimed[c] = true;
            }
            let Some(model) = model else {
                continue;
            };
            let subset: Vec<Vec<f64>> = x.iter().map(|row| select(row, columns)).collect();
            for (row, transformed) in out.iter_mut().zip(model.transform(&subset)?) {
                row.extend(transformed);
            }
        }
        if self.remainder == PASSTHROUGH {
            let rest: Vec<usize> = (0..n_features).filter(|&c| !claimed[c]).collect();
            for (row, source) in out.iter_mut().zip(x) {
                row.extend(select(source, &rest));
            }
        }
        Ok(out)
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learnkit::preprocessing::StandardScaler;

    #[test]
    fn transforms_selected_columns_and_passes_the_rest() {
        let x = vec![vec![1.0, 10.0, 7.0], vec![3.0, 10.0, 8.0]];
        let mut model = ColumnTransformer::new()
            .transformer("scale", StandardScaler::new(), &[0])
            .remainder(PASSTHROUGH);
        model.fit(&x, &[0.0, 1.0]).unwrap();
        let out = model.transform(&x).unwrap();
        assert_eq!(out, vec![vec![-1.0, 10.0, 7.0], vec![1.0, 10.0, 8.0]]);
    }

    #[test]
    fn steps_carry_their_columns() {
        let model = ColumnTransformer::new().transformer("scale", StandardScaler::new(), &[0, 2]);
        let params = model.get_params_deep();
        assert!(params.contains_key("scale"));
        assert!(params.contains_key("scale__with_mean"));
        let Some([_, _, columns]) = params["transformers"].as_sequence().and_then(|t| t[0].as_sequence()) else {
            panic!("transformer entries should be 3-tuples");
        };
        assert_eq!(columns, &Value::List(vec![Value::Int(0), Value::Int(2)]));
    }

    #[test]
    fn out_of_range_columns_are_rejected() {
        let mut model = ColumnTransformer::new().transformer("scale", StandardScaler::new(), &[5]);
        assert!(matches!(
            model.fit(&[vec![1.0]], &[1.0]),
            Err(ModelError::InvalidParameter { .. })
        ));
    }
}
