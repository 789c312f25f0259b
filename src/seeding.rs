//! Deterministic seeding of every unseeded random state in a model tree.

use crate::error::CodecError;
use crate::estimator::Estimator;
use crate::value::{Params, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

const RANDOM_STATE: &str = "random_state";
const SEED_UPPER_BOUND: i64 = 1 << 16;

/// Returns a copy of `model` in which every `random_state` that is still
/// null, including those of nested cross-validation splitters, holds a seed
/// derived from `seed`.
///
/// Candidate parameters are visited in sorted name order and every candidate
/// consumes one draw, whether or not it ends up being seeded. Two models whose
/// candidate names match therefore receive identical seeds, regardless of
/// which of them were already set. Without a root seed the draws come from
/// the operating system.
pub fn seed_model(model: &dyn Estimator, seed: Option<u64>) -> Result<Box<dyn Estimator>, CodecError> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut params: Vec<(String, Value)> = model.get_params_deep().into_iter().collect();
    params.sort_by(|a, b| a.0.cmp(&b.0));

    let mut seeded = Params::new();
    for (name, value) in params {
        if name.contains(RANDOM_STATE) {
            let drawn = rng.random_range(0..SEED_UPPER_BOUND);
            if needs_seed(&name, &value)? {
                debug!(parameter = %name, seed = drawn, "seeding parameter");
                seeded.insert(name, Value::Int(drawn));
            }
        } else if let Value::CrossValidator(splitter) = value {
            let Some(current) = splitter.get_params().shift_remove(RANDOM_STATE) else {
                continue;
            };
            let drawn = rng.random_range(0..SEED_UPPER_BOUND);
            if needs_seed(&name, &current)? {
                debug!(parameter = %name, seed = drawn, "seeding cross-validator");
                let mut splitter = splitter.clone();
                splitter.set_param(RANDOM_STATE, Value::Int(drawn))?;
                seeded.insert(name, Value::CrossValidator(splitter));
            }
        }
    }

    let mut model = model.clone_box();
    model.set_params(seeded)?;
    Ok(model)
}

/// Integers are kept as they are and null is seeded; anything else is an
/// invalid random state.
fn needs_seed(name: &str, current: &Value) -> Result<bool, CodecError> {
    if current.as_i64().is_some() {
        return Ok(false);
    }
    if current.is_null() {
        return Ok(true);
    }
    Err(CodecError::InvalidSeedState {
        name: name.to_string(),
        found: current.type_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_states_are_kept_and_null_states_seeded() {
        assert!(!needs_seed("random_state", &Value::Int(3)).unwrap());
        assert!(needs_seed("random_state", &Value::Null).unwrap());
        assert!(matches!(
            needs_seed("random_state", &Value::Str("legacy".into())),
            Err(CodecError::InvalidSeedState { .. })
        ));
    }
}
