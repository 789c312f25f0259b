use crate::error::ModelError;
use crate::estimator::Estimator;
use crate::learnkit::{check_features, check_training_data, constructor_params};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone, PartialEq)]
struct Coefficients {
    weights: Vec<f64>,
    intercept: f64,
}

impl Coefficients {
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        check_features(x, self.weights.len())?;
        Ok(x.iter()
            .map(|row| dot(row, &self.weights) + self.intercept)
            .collect())
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Linear least squares with an L2 penalty, solved in closed form.
#[derive(Debug, Clone)]
pub struct Ridge {
    alpha: f64,
    fit_intercept: bool,
    coefficients: Option<Coefficients>,
}

impl Default for Ridge {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            fit_intercept: true,
            coefficients: None,
        }
    }
}

impl Ridge {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            ..Self::default()
        }
    }

    pub fn fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }
}

impl Estimator for Ridge {
    constructor_params!("learnkit.linear_model.Ridge", [alpha, fit_intercept]);

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        let n_features = check_training_data(x, y)?;
        let n = x.len() as f64;
        let (x_mean, y_mean) = if self.fit_intercept {
            let mut x_mean = vec![0.0; n_features];
            for row in x {
                for (m, v) in x_mean.iter_mut().zip(row) {
                    *m += v / n;
                }
            }
            (x_mean, y.iter().sum::<f64>() / n)
        } else {
            (vec![0.0; n_features], 0.0)
        };

        let mut gram = vec![vec![0.0; n_features]; n_features];
        let mut moment = vec![0.0; n_features];
        for (row, target) in x.iter().zip(y) {
            let centered: Vec<f64> = row.iter().zip(&x_mean).map(|(v, m)| v - m).collect();
            for i in 0..n_features {
                moment[i] += centered[i] * (target - y_mean);
                for j in 0..n_features {
                    gram[i][j] += centered[i] * centered[j];
                }
            }
        }
        for (i, row) in gram.iter_mut().enumerate() {
            row[i] += self.alpha;
        }

        let weights = solve(gram, moment)?;
        let intercept = y_mean - dot(&x_mean, &weights);
        self.coefficients = Some(Coefficients { weights, intercept });
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        self.coefficients
            .as_ref()
            .ok_or_else(|| ModelError::NotFitted(self.class_name().to_string()))?
            .predict(x)
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, ModelError> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            return Err(ModelError::SingularMatrix);
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * solution[k]).sum();
        solution[row] = (b[row] - tail) / a[row][row];
    }
    Ok(solution)
}

/// Linear regression fitted by stochastic gradient descent with a constant
/// learning rate.
#[derive(Debug, Clone)]
pub struct SgdRegressor {
    alpha: f64,
    eta0: f64,
    max_iter: usize,
    shuffle: bool,
    random_state: Option<i64>,
    coefficients: Option<Coefficients>,
}

impl Default for SgdRegressor {
    fn default() -> Self {
        Self {
            alpha: 0.0001,
            eta0: 0.01,
            max_iter: 100,
            shuffle: true,
            random_state: None,
            coefficients: None,
        }
    }
}

impl SgdRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn random_state(mut self, random_state: Option<i64>) -> Self {
        self.random_state = random_state;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }
}

impl Estimator for SgdRegressor {
    constructor_params!(
        "learnkit.linear_model.SgdRegressor",
        [alpha, eta0, max_iter, shuffle, random_state]
    );

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        let n_features = check_training_data(x, y)?;
        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed as u64),
            None => StdRng::from_os_rng(),
        };
        let mut weights = vec![0.0; n_features];
        let mut intercept = 0.0;
        let mut order: Vec<usize> = (0..x.len()).collect();
        for _ in 0..self.max_iter {
            if self.shuffle {
                order.shuffle(&mut rng);
            }
            for &i in &order {
                let error = dot(&x[i], &weights) + intercept - y[i];
                for (w, v) in weights.iter_mut().zip(&x[i]) {
                    *w -= self.eta0 * (error * v + self.alpha * *w);
                }
                intercept -= self.eta0 * error;
            }
        }
        if !intercept.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(ModelError::InvalidData(
                "gradient descent diverged; lower eta0".to_string(),
            ));
        }
        self.coefficients = Some(Coefficients { weights, intercept });
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        self.coefficients
            .as_ref()
            .ok_or_else(|| ModelError::NotFitted(self.class_name().to_string()))?
            .predict(x)
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64]).collect();
        let y = x.iter().map(|row| 2.0 * row[0] + 1.0).collect();
        (x, y)
    }

    #[test]
    fn ridge_recovers_a_line_without_penalty() {
        let (x, y) = line();
        let mut ridge = Ridge::new(0.0);
        ridge.fit(&x, &y).unwrap();
        let pred = ridge.predict(&[vec![10.0]]).unwrap();
        assert!((pred[0] - 21.0).abs() < 1e-9);
    }

    #[test]
    fn singular_system_is_reported() {
        let x = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        let mut ridge = Ridge::new(0.0).fit_intercept(false);
        assert_eq!(ridge.fit(&x, &[1.0, 1.0]), Err(ModelError::SingularMatrix));
    }

    #[test]
    fn sgd_is_reproducible_with_a_seed() {
        let (x, y) = line();
        let mut a = SgdRegressor::new().random_state(Some(3));
        let mut b = SgdRegressor::new().random_state(Some(3));
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }
}
