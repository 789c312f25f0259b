use std::fmt;

/// Signature shared by every function that can be referenced from a flow:
/// a score computed from true and predicted targets.
pub type ScoreFn = fn(&[f64], &[f64]) -> f64;

/// A free function referenced by its fully qualified name.
///
/// Only plain `fn` pointers are representable; closures cannot be named and
/// therefore cannot be encoded.
#[derive(Clone)]
pub struct Function {
    name: String,
    handle: ScoreFn,
}

impl Function {
    pub fn new(name: impl Into<String>, handle: ScoreFn) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, y_true: &[f64], y_pred: &[f64]) -> f64 {
        (self.handle)(y_true, y_pred)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Function").field(&self.name).finish()
    }
}
