use crate::error::ModelError;
use crate::estimator::Estimator;
use crate::learnkit::linear_model::Ridge;
use crate::learnkit::{check_steps, check_training_data, constructor_params, step_models_mut, take, take_rows};
use crate::value::Value;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Averages copies of one base estimator fitted on bootstrap samples.
#[derive(Debug, Clone)]
pub struct BaggingRegressor {
    /// Defaults to [`Ridge`] when null.
    base_estimator: Option<Box<dyn Estimator>>,
    n_estimators: usize,
    /// Fraction of the samples drawn for each member.
    max_samples: f64,
    random_state: Option<i64>,
    members: Vec<Box<dyn Estimator>>,
}

impl Default for BaggingRegressor {
    fn default() -> Self {
        Self {
            base_estimator: None,
            n_estimators: 10,
            max_samples: 1.0,
            random_state: None,
            members: Vec::new(),
        }
    }
}

impl BaggingRegressor {
    pub fn new(base_estimator: impl Estimator + 'static) -> Self {
        Self {
            base_estimator: Some(Box::new(base_estimator)),
            ..Self::default()
        }
    }

    pub fn n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn random_state(mut self, random_state: Option<i64>) -> Self {
        self.random_state = random_state;
        self
    }
}

impl Estimator for BaggingRegressor {
    constructor_params!(
        "learnkit.ensemble.BaggingRegressor",
        [base_estimator, n_estimators, max_samples, random_state]
    );

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        check_training_data(x, y)?;
        if !(self.max_samples > 0.0 && self.max_samples <= 1.0) {
            return Err(ModelError::InvalidParameter {
                class_name: self.class_name().to_string(),
                name: "max_samples".to_string(),
                expected: "a fraction in (0, 1]",
                found: self.max_samples.to_string(),
            });
        }
        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed as u64),
            None => StdRng::from_os_rng(),
        };
        let n_draws = ((x.len() as f64 * self.max_samples).ceil() as usize).max(1);

        let mut members = Vec::with_capacity(self.n_estimators);
        for _ in 0..self.n_estimators {
            let sample: Vec<usize> = (0..n_draws).map(|_| rng.random_range(0..x.len())).collect();
            let mut member: Box<dyn Estimator> = match &self.base_estimator {
                Some(base) => base.clone(),
                None => Box::new(Ridge::default()),
            };
            member.fit(&take_rows(x, &sample), &take(y, &sample))?;
            members.push(member);
        }
        self.members = members;
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        if self.members.is_empty() {
            return Err(ModelError::NotFitted(self.class_name().to_string()));
        }
        let mut sum = vec![0.0; x.len()];
        for member in &self.members {
            for (s, p) in sum.iter_mut().zip(member.predict(x)?) {
                *s += p;
            }
        }
        let n = self.members.len() as f64;
        Ok(sum.into_iter().map(|s| s / n).collect())
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }
}

/// Weighted average of the predictions of several named estimators.
///
/// `estimators` is a list of `(name, model)` tuples; null entries are skipped
/// together with their weight.
#[derive(Debug, Clone)]
pub struct VotingRegressor {
    estimators: Value,
    weights: Option<Vec<f64>>,
    fitted: bool,
}

impl Default for VotingRegressor {
    fn default() -> Self {
        Self {
            estimators: Value::List(Vec::new()),
            weights: None,
            fitted: false,
        }
    }
}

impl VotingRegressor {
    /// Builds the ensemble from entries made with [`Value::step`].
    pub fn new(estimators: Vec<Value>) -> Self {
        Self {
            estimators: Value::List(estimators),
            ..Self::default()
        }
    }

    pub fn weights(mut self, weights: Option<Vec<f64>>) -> Self {
        self.weights = weights;
        self
    }
}

impl Estimator for VotingRegressor {
    constructor_params!("learnkit.ensemble.VotingRegressor", [estimators, weights]);

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        check_steps(self.class_name(), "estimators", &self.estimators, 2)?;
        let n_entries = self.estimators.as_sequence().map_or(0, <[Value]>::len);
        if let Some(weights) = &self.weights {
            if weights.len() != n_entries {
                return Err(ModelError::InvalidParameter {
                    class_name: self.class_name().to_string(),
                    name: "weights".to_string(),
                    expected: "one weight per estimator",
                    found: format!("{} weights for {} estimators", weights.len(), n_entries),
                });
            }
        }
        check_training_data(x, y)?;
        for model in step_models_mut(&mut self.estimators) {
            model.fit(x, y)?;
        }
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        if !self.fitted {
            return Err(ModelError::NotFitted(self.class_name().to_string()));
        }
        let entries = self.estimators.as_sequence().unwrap_or_default();
        let mut sum = vec![0.0; x.len()];
        let mut total = 0.0;
        for (i, entry) in entries.iter().enumerate() {
            let Some([Value::Str(_), Value::Model(model), ..]) = entry.as_sequence() else {
                continue;
            };
            let weight = self.weights.as_ref().map_or(1.0, |w| w[i]);
            for (s, p) in sum.iter_mut().zip(model.predict(x)?) {
                *s += weight * p;
            }
            total += weight;
        }
        if total == 0.0 {
            return Err(ModelError::InvalidData("all estimators are dropped or weightless".to_string()));
        }
        Ok(sum.into_iter().map(|s| s / total).collect())
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y = x.iter().map(|row| row[0] - 2.0).collect();
        (x, y)
    }

    #[test]
    fn bagging_is_reproducible_with_a_seed() {
        let (x, y) = data();
        let mut a = BaggingRegressor::new(Ridge::new(0.1)).n_estimators(4).random_state(Some(11));
        let mut b = a.clone();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn base_estimator_is_a_nested_model() {
        let params = BaggingRegressor::new(Ridge::new(3.0)).get_params_deep();
        assert_eq!(params["base_estimator__alpha"], Value::Float(3.0));
        assert_eq!(BaggingRegressor::default().get_params()["base_estimator"], Value::Null);
    }

    #[test]
    fn voting_skips_null_entries() {
        let (x, y) = data();
        let mut model = VotingRegressor::new(vec![
            Value::step("ridge", Ridge::new(0.0)),
            Value::Tuple(vec![Value::Str("dropped".into()), Value::Null]),
        ])
        .weights(Some(vec![2.0, 5.0]));
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&[vec![4.0]]).unwrap();
        assert!((pred[0] - 2.0).abs() < 1e-9);
    }
}
