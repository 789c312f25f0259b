use crate::value::{Params, Value};
use rand::rngs::StdRng;
use std::fmt::Debug;
use std::sync::Arc;

/// An unbound probability distribution, resolved from the registry by its
/// fully qualified name.
pub trait DistributionFamily: Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Lower and upper support bounds for the given shape arguments.
    fn support(&self, args: &[Value], kwds: &Params) -> (f64, f64);

    /// Draws one value from the frozen distribution.
    fn sample(&self, dist: &FrozenDistribution, rng: &mut StdRng) -> Value;
}

/// A distribution with its constructor arguments bound.
#[derive(Debug, Clone)]
pub struct FrozenDistribution {
    family: Arc<dyn DistributionFamily>,
    pub a: f64,
    pub b: f64,
    pub args: Vec<Value>,
    pub kwds: Params,
}

impl FrozenDistribution {
    pub fn freeze(family: Arc<dyn DistributionFamily>, args: Vec<Value>, kwds: Params) -> Self {
        let (a, b) = family.support(&args, &kwds);
        Self {
            family,
            a,
            b,
            args,
            kwds,
        }
    }

    /// Overrides the support bounds computed at freeze time.
    pub fn with_bounds(mut self, a: f64, b: f64) -> Self {
        self.a = a;
        self.b = b;
        self
    }

    pub fn name(&self) -> &str {
        self.family.name()
    }

    pub fn rvs(&self, rng: &mut StdRng) -> Value {
        self.family.sample(self, rng)
    }

    /// Reads a numeric argument by keyword first, then by position.
    pub fn arg(&self, position: usize, keyword: &str, default: f64) -> f64 {
        argument(&self.args, &self.kwds, position, keyword, default)
    }
}

pub(crate) fn argument(
    args: &[Value],
    kwds: &Params,
    position: usize,
    keyword: &str,
    default: f64,
) -> f64 {
    kwds.get(keyword)
        .or_else(|| args.get(position))
        .and_then(Value::as_f64)
        .unwrap_or(default)
}

fn same_bound(x: f64, y: f64) -> bool {
    x == y || (x.is_nan() && y.is_nan())
}

impl PartialEq for FrozenDistribution {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
            && same_bound(self.a, other.a)
            && same_bound(self.b, other.b)
            && self.args == other.args
            && self.kwds == other.kwds
    }
}
