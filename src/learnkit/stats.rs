//! Distribution families usable in randomized search spaces.

use crate::special::{DistributionFamily, FrozenDistribution, argument};
use crate::value::{Params, Value};
use rand::Rng;
use rand::rngs::StdRng;
use std::f64::consts::PI;

/// Continuous uniform on `[loc, loc + scale]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uniform;

impl DistributionFamily for Uniform {
    fn name(&self) -> &str {
        "learnkit.stats.uniform"
    }

    fn support(&self, args: &[Value], kwds: &Params) -> (f64, f64) {
        let loc = argument(args, kwds, 0, "loc", 0.0);
        let scale = argument(args, kwds, 1, "scale", 1.0);
        (loc, loc + scale)
    }

    fn sample(&self, dist: &FrozenDistribution, rng: &mut StdRng) -> Value {
        let loc = dist.arg(0, "loc", 0.0);
        let scale = dist.arg(1, "scale", 1.0);
        Value::Float(loc + scale * rng.random::<f64>())
    }
}

/// Gaussian with mean `loc` and standard deviation `scale`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normal;

impl DistributionFamily for Normal {
    fn name(&self) -> &str {
        "learnkit.stats.norm"
    }

    fn support(&self, _args: &[Value], _kwds: &Params) -> (f64, f64) {
        (f64::NEG_INFINITY, f64::INFINITY)
    }

    fn sample(&self, dist: &FrozenDistribution, rng: &mut StdRng) -> Value {
        let loc = dist.arg(0, "loc", 0.0);
        let scale = dist.arg(1, "scale", 1.0);
        // Box-Muller; 1 - u keeps the logarithm finite.
        let u1: f64 = 1.0 - rng.random::<f64>();
        let u2: f64 = rng.random();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        Value::Float(loc + scale * z)
    }
}

/// Discrete uniform on the integers `low..high`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandInt;

impl DistributionFamily for RandInt {
    fn name(&self) -> &str {
        "learnkit.stats.randint"
    }

    fn support(&self, args: &[Value], kwds: &Params) -> (f64, f64) {
        let low = argument(args, kwds, 0, "low", 0.0);
        let high = argument(args, kwds, 1, "high", 1.0);
        (low, high - 1.0)
    }

    fn sample(&self, dist: &FrozenDistribution, rng: &mut StdRng) -> Value {
        let low = dist.arg(0, "low", 0.0) as i64;
        let high = dist.arg(1, "high", 1.0) as i64;
        if high <= low {
            return Value::Int(low);
        }
        Value::Int(rng.random_range(low..high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::sync::Arc;

    #[test]
    fn support_follows_arguments() {
        let uniform = FrozenDistribution::freeze(Arc::new(Uniform), vec![Value::Int(2), Value::Int(3)], Params::new());
        assert_eq!((uniform.a, uniform.b), (2.0, 5.0));

        let mut kwds = Params::new();
        kwds.insert("high".to_string(), Value::Int(10));
        let randint = FrozenDistribution::freeze(Arc::new(RandInt), vec![Value::Int(1)], kwds);
        assert_eq!((randint.a, randint.b), (1.0, 9.0));

        let norm = FrozenDistribution::freeze(Arc::new(Normal), Vec::new(), Params::new());
        assert!(norm.a.is_infinite() && norm.b.is_infinite());
    }

    #[test]
    fn samples_stay_in_support() {
        let mut rng = StdRng::seed_from_u64(7);
        let randint = FrozenDistribution::freeze(Arc::new(RandInt), vec![Value::Int(1), Value::Int(4)], Params::new());
        let uniform = FrozenDistribution::freeze(Arc::new(Uniform), Vec::new(), Params::new());
        for _ in 0..100 {
            let Value::Int(i) = randint.rvs(&mut rng) else {
                panic!("randint should draw integers");
            };
            assert!((1..4).contains(&i));
            let x = uniform.rvs(&mut rng).as_f64().unwrap();
            assert!((0.0..=1.0).contains(&x));
        }
    }
}
