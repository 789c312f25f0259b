//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the modelflow crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use modelflow::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let extension = Extension::default();
//! let flow = Flow::from_json(&std::fs::read_to_string("path/to/flow.json")?)?;
//!
//! let model = extension.flow_to_model(&flow)?;
//! let seeded = extension.seed_model(model.as_ref(), Some(42))?;
//! println!("{}", extension.model_to_flow(seeded.as_ref())?.name);
//! # Ok(())
//! # }
//! ```

// Codec and facade
pub use crate::codec::{Codec, CodecBuilder, Serialized};
pub use crate::config::CodecConfig;
pub use crate::extension::Extension;

// Flow descriptors
pub use crate::flow::{Flow, ParameterSetting};

// Runtime object model
pub use crate::estimator::{Estimator, HyperparameterSearch};
pub use crate::registry::{DefaultFactory, DefaultSplitterFactory, EstimatorFactory, Registry, SplitterFactory};
pub use crate::special::{CrossValidator, DistributionFamily, Fold, FrozenDistribution, Function, ScalarType};
pub use crate::value::{Params, Value};

// Traces
pub use crate::trace::{SearchResults, TraceRow};

// Error types
pub use crate::error::{CodecError, DependencyError, ModelError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
