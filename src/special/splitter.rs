use crate::error::ModelError;
use crate::value::Params;
use crate::value::Value;
use std::fmt::Debug;

/// One train/test partition of sample indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Cross-validation splitters. They are encoded by class name and
/// constructor parameters, never as components.
pub trait CrossValidator: Debug + Send + Sync {
    fn class_name(&self) -> &str;

    /// Every constructor parameter, deprecated ones included.
    fn get_params(&self) -> Params;

    /// Constructor parameters that are still accepted but no longer encoded.
    fn deprecated_params(&self) -> &'static [&'static str] {
        &[]
    }

    fn set_param(&mut self, name: &str, value: Value) -> Result<(), ModelError>;

    fn split(&self, n_samples: usize) -> Vec<Fold>;

    fn clone_box(&self) -> Box<dyn CrossValidator>;
}

impl Clone for Box<dyn CrossValidator> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
