use crate::error::ModelError;
use crate::estimator::{Estimator, named_steps};
use crate::learnkit::{check_steps, constructor_params, step_models_mut};
use crate::value::Value;

/// A chain of transformers followed by a final estimator.
///
/// `steps` is a list of `(name, model)` tuples. A null model skips the step.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Value,
    memory: Option<String>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            steps: Value::List(Vec::new()),
            memory: None,
        }
    }
}

impl Pipeline {
    /// Builds a pipeline from entries made with [`Value::step`].
    pub fn new(steps: Vec<Value>) -> Self {
        Self {
            steps: Value::List(steps),
            memory: None,
        }
    }

    pub fn memory(mut self, memory: Option<String>) -> Self {
        self.memory = memory;
        self
    }
}

impl Estimator for Pipeline {
    constructor_params!("learnkit.pipeline.Pipeline", [steps, memory]);

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        check_steps(self.class_name(), "steps", &self.steps, 2)?;
        let mut models = step_models_mut(&mut self.steps);
        let Some(last) = models.len().checked_sub(1) else {
            return Err(ModelError::InvalidData("pipeline has no steps".to_string()));
        };
        let mut data = x.to_vec();
        for (i, model) in models.iter_mut().enumerate() {
            model.fit(&data, y)?;
            if i < last {
                data = model.transform(&data)?;
            }
        }
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        let steps = named_steps(&self.steps);
        let Some(((_, last), head)) = steps.split_last() else {
            return Err(ModelError::NotFitted(self.class_name().to_string()));
        };
        let mut data = x.to_vec();
        for (_, model) in head {
            data = model.transform(&data)?;
        }
        last.predict(&data)
    }

    fn transform(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ModelError> {
        let mut data = x.to_vec();
        for (_, model) in named_steps(&self.steps) {
            data = model.transform(&data)?;
        }
        Ok(data)
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learnkit::linear_model::Ridge;
    use crate::learnkit::preprocessing::StandardScaler;
    use crate::value::Params;

    fn pipeline() -> Pipeline {
        Pipeline::new(vec![
            Value::step("scale", StandardScaler::new()),
            Value::step("fit", Ridge::new(2.0)),
        ])
    }

    #[test]
    fn deep_params_expose_steps() {
        let params = pipeline().get_params_deep();
        let names: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            [
                "steps",
                "memory",
                "scale",
                "fit",
                "fit__alpha",
                "fit__fit_intercept",
                "scale__dtype",
                "scale__with_mean",
                "scale__with_std"
            ]
        );
    }

    #[test]
    fn nested_names_are_routed_to_steps() {
        let mut model = pipeline();
        let mut params = Params::new();
        params.insert("fit__alpha".to_string(), Value::Float(0.5));
        model.set_params(params).unwrap();
        assert_eq!(model.get_params_deep()["fit__alpha"], Value::Float(0.5));
    }

    #[test]
    fn fits_through_the_chain() {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..6).map(|i| 3.0 * i as f64).collect();
        let mut model = Pipeline::new(vec![
            Value::step("scale", StandardScaler::new()),
            Value::step("fit", Ridge::new(0.0)),
        ]);
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&[vec![2.0]]).unwrap();
        assert!((pred[0] - 6.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_steps_are_rejected() {
        let mut model = Pipeline::new(vec![Value::Str("scale".into())]);
        assert!(matches!(
            model.fit(&[vec![1.0]], &[1.0]),
            Err(ModelError::InvalidParameter { .. })
        ));
    }
}
