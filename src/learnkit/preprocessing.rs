use crate::error::ModelError;
use crate::estimator::Estimator;
use crate::learnkit::{check_features, check_training_data, constructor_params};
use crate::special::ScalarType;

/// Centers features and scales them to unit variance.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    with_mean: bool,
    with_std: bool,
    /// Element type of the transformed output.
    dtype: ScalarType,
    mean: Option<Vec<f64>>,
    scale: Option<Vec<f64>>,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self {
            with_mean: true,
            with_std: true,
            dtype: ScalarType::Float64,
            mean: None,
            scale: None,
        }
    }
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mean(mut self, with_mean: bool) -> Self {
        self.with_mean = with_mean;
        self
    }

    pub fn with_std(mut self, with_std: bool) -> Self {
        self.with_std = with_std;
        self
    }

    pub fn dtype(mut self, dtype: ScalarType) -> Self {
        self.dtype = dtype;
        self
    }
}

impl Estimator for StandardScaler {
    constructor_params!("learnkit.preprocessing.StandardScaler", [with_mean, with_std, dtype]);

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        let n_features = check_training_data(x, y)?;
        let n = x.len() as f64;
        let mut mean = vec![0.0; n_features];
        for row in x {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }
        let mut scale = vec![0.0; n_features];
        for row in x {
            for ((s, v), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2) / n;
            }
        }
        // Constant features are left unscaled.
        for s in &mut scale {
            *s = if *s > 0.0 { s.sqrt() } else { 1.0 };
        }
        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(())
    }

    fn transform(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ModelError> {
        let (Some(mean), Some(scale)) = (&self.mean, &self.scale) else {
            return Err(ModelError::NotFitted(self.class_name().to_string()));
        };
        check_features(x, mean.len())?;
        let single = matches!(self.dtype, ScalarType::Float32);
        Ok(x.iter()
            .map(|row| {
                row.iter()
                    .zip(mean.iter().zip(scale))
                    .map(|(v, (m, s))| {
                        let mut out = *v;
                        if self.with_mean {
                            out -= m;
                        }
                        if self.with_std {
                            out /= s;
                        }
                        if single { out as f32 as f64 } else { out }
                    })
                    .collect()
            })
            .collect())
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardizes_columns() {
        let x = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let mut scaler = StandardScaler::new();
        scaler.fit(&x, &[0.0, 0.0]).unwrap();
        let out = scaler.transform(&x).unwrap();
        assert_eq!(out, vec![vec![-1.0, 0.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn transform_requires_fit() {
        assert!(matches!(
            StandardScaler::new().transform(&[vec![1.0]]),
            Err(ModelError::NotFitted(_))
        ));
    }
}
