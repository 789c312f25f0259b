//! Scorers. Higher is always better.

pub const R2_SCORE: &str = "learnkit.metrics.r2_score";
pub const NEG_MEAN_SQUARED_ERROR: &str = "learnkit.metrics.neg_mean_squared_error";
pub const NEG_MEAN_ABSOLUTE_ERROR: &str = "learnkit.metrics.neg_mean_absolute_error";

/// Coefficient of determination. A constant target scores 1.0 when predicted
/// exactly and 0.0 otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let residual: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let total: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if total == 0.0 {
        return if residual == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - residual / total
}

pub fn neg_mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    -mean(y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)), y_true.len())
}

pub fn neg_mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    -mean(y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()), y_true.len())
}

fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let y = [1.0, 2.0, 3.0];
        assert_eq!(r2_score(&y, &y), 1.0);
        assert_eq!(neg_mean_squared_error(&y, &y), 0.0);
    }

    #[test]
    fn errors_are_negated() {
        let y = [1.0, 2.0, 3.0];
        let pred = [2.0, 2.0, 2.0];
        assert_eq!(r2_score(&y, &pred), 0.0);
        assert!((neg_mean_squared_error(&y, &pred) + 2.0 / 3.0).abs() < 1e-12);
        assert!((neg_mean_absolute_error(&y, &pred) + 2.0 / 3.0).abs() < 1e-12);
    }
}
