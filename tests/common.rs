//! Common test utilities for building models, flows and training data.
use modelflow::learnkit::linear_model::Ridge;
use modelflow::learnkit::model_selection::{GridSearchCv, KFold};
use modelflow::learnkit::pipeline::Pipeline;
use modelflow::learnkit::preprocessing::StandardScaler;
use modelflow::prelude::*;

/// A codec with the built-in `learnkit` family and default configuration.
#[allow(dead_code)]
pub fn codec() -> Codec {
    Codec::builder().build()
}

/// `family==version,modelflow==version` as stamped on every built-in flow.
#[allow(dead_code)]
pub fn builtin_external_version() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("learnkit=={},modelflow=={}", version, version)
}

/// Creates the two-step pipeline used throughout the tests.
///
/// Steps: `scale` (StandardScaler) -> `fit` (Ridge, alpha 2.0)
#[allow(dead_code)]
pub fn pipeline_model() -> Pipeline {
    Pipeline::new(vec![
        Value::step("scale", StandardScaler::new()),
        Value::step("fit", Ridge::new(2.0)),
    ])
}

/// A grid search over [`pipeline_model`] tuning the ridge penalty.
#[allow(dead_code)]
pub fn search_model() -> GridSearchCv {
    let grid = Value::dict([(
        "fit__alpha",
        Value::List(vec![Value::Float(0.01), Value::Float(1.0), Value::Float(100.0)]),
    )]);
    GridSearchCv::new(pipeline_model(), grid).cv(Value::CrossValidator(Box::new(KFold::new(3))))
}

/// Creates a small linear regression problem: `y = 2*x0 - x1 + 1`.
#[allow(dead_code)]
pub fn linear_data() -> (Vec<Vec<f64>>, Vec<f64>) {
    let x: Vec<Vec<f64>> = (0..15)
        .map(|i| vec![i as f64, ((i * 7) % 5) as f64])
        .collect();
    let y = x.iter().map(|row| 2.0 * row[0] - row[1] + 1.0).collect();
    (x, y)
}

/// Assigns consecutive flow ids, depth first, starting at `first`.
///
/// Mimics what an external registry does once a flow has been published.
#[allow(dead_code)]
pub fn identify(flow: &mut Flow, first: u64) -> u64 {
    flow.flow_id = Some(first);
    let mut next = first + 1;
    for component in flow.components.values_mut() {
        next = identify(component, next);
    }
    next
}
