//! # Modelflow - Model/Flow Codec
//!
//! **Modelflow** converts nested, trainable model objects into portable, versioned
//! *flow descriptors* and back. A flow records a model's class, its hyper-parameters
//! as JSON wire strings, and every nested sub-model as a named component flow, so
//! that the exact configuration can be stored, shared and reconstructed later.
//!
//! ## Core Workflow
//!
//! 1.  **Build a Codec**: `Codec::builder()` starts from a registry holding the
//!     built-in `learnkit` family. Register your own estimator factories, splitters,
//!     distributions and functions on the builder.
//! 2.  **Encode**: `Codec::model_to_flow` walks the model bottom-up and produces a
//!     `Flow` whose components are themselves flows.
//! 3.  **Store**: a `Flow` serializes to JSON or, via `bincode`, to a compact file.
//! 4.  **Decode**: `Codec::flow_to_model` checks the flow's family and dependencies,
//!     resolves every component reference exactly once and rebuilds the model.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modelflow::prelude::*;
//! use modelflow::learnkit::linear_model::Ridge;
//! use modelflow::learnkit::pipeline::Pipeline;
//! use modelflow::learnkit::preprocessing::StandardScaler;
//!
//! fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let codec = Codec::builder().build();
//!
//!     let model = Pipeline::new(vec![
//!         Value::step("scale", StandardScaler::new()),
//!         Value::step("fit", Ridge::new(2.0)),
//!     ]);
//!
//!     // Encode the pipeline; `scale` and `fit` become components.
//!     let flow = codec.model_to_flow(&model)?;
//!     println!("{}", flow.name);
//!     println!("steps = {:?}", flow.parameters["steps"]);
//!
//!     // Store and reload the descriptor.
//!     flow.save("pipeline.flow")?;
//!     let flow = Flow::from_file("pipeline.flow")?;
//!
//!     // Rebuild an equivalent, unfitted model.
//!     let mut rebuilt = codec.flow_to_model(&flow)?;
//!     rebuilt.fit(&[vec![0.0], vec![1.0], vec![2.0]], &[1.0, 3.0, 5.0])?;
//!     println!("{:?}", rebuilt.predict(&[vec![3.0]])?);
//!
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod dependency;
pub mod error;
pub mod estimator;
pub mod extension;
pub mod flow;
pub mod learnkit;
pub mod prelude;
pub mod registry;
pub mod seeding;
pub mod special;
pub mod trace;
pub mod value;
