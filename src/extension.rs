//! The facade a run-execution collaborator talks to.

use crate::codec::Codec;
use crate::config::CODEC_PACKAGE;
use crate::error::CodecError;
use crate::estimator::{Estimator, HyperparameterSearch, is_estimator};
use crate::flow::{Flow, ParameterSetting};
use crate::seeding;
use crate::trace::{self, AttributeType, TraceRow};
use crate::value::Value;

const N_JOBS: &str = "n_jobs";

/// Bundles a [`Codec`] with the run-level helpers built on top of it.
pub struct Extension {
    codec: Codec,
}

impl Default for Extension {
    fn default() -> Self {
        Self::new(Codec::default())
    }
}

impl Extension {
    pub fn new(codec: Codec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Whether the flow was created from this codec's model family.
    pub fn can_handle_flow(&self, flow: &Flow) -> bool {
        let marker = format!("{}==", self.codec.config().family);
        flow.external_version.starts_with(&marker)
            || flow.external_version.contains(&format!(",{}", marker))
    }

    pub fn can_handle_model(&self, value: &Value) -> bool {
        is_estimator(value)
    }

    pub fn flow_to_model(&self, flow: &Flow) -> Result<Box<dyn Estimator>, CodecError> {
        self.codec.flow_to_model(flow)
    }

    pub fn flow_to_model_with_defaults(&self, flow: &Flow) -> Result<Box<dyn Estimator>, CodecError> {
        self.codec.flow_to_model_with_defaults(flow)
    }

    pub fn model_to_flow(&self, model: &dyn Estimator) -> Result<Flow, CodecError> {
        self.codec.model_to_flow(model)
    }

    pub fn flow_to_parameters(
        &self,
        flow: &Flow,
        model: &dyn Estimator,
    ) -> Result<Vec<ParameterSetting>, CodecError> {
        self.codec.flow_to_parameters(flow, model)
    }

    pub fn is_estimator(&self, value: &Value) -> bool {
        is_estimator(value)
    }

    pub fn seed_model(&self, model: &dyn Estimator, seed: Option<u64>) -> Result<Box<dyn Estimator>, CodecError> {
        seeding::seed_model(model, seed)
    }

    /// Returns whether every `n_jobs` parameter of the model is 1 or null.
    ///
    /// Fails if the model is a search whose search space tunes an `n_jobs`
    /// parameter at any depth.
    pub fn check_n_jobs(&self, model: &dyn Estimator) -> Result<bool, CodecError> {
        if let Some(search) = model.as_search() {
            if let Some(name) = tuned_n_jobs(search.search_space()) {
                return Err(CodecError::InvalidSearchSpace(format!(
                    "'{}' of {} tunes {}; parallelism must not be optimized",
                    name,
                    model.class_name(),
                    N_JOBS
                )));
            }
        }
        Ok(model
            .get_params_deep()
            .iter()
            .filter(|(name, _)| last_segment(name) == N_JOBS)
            .all(|(_, value)| value.is_null() || value.as_i64() == Some(1)))
    }

    pub fn is_hpo_class(&self, model: &dyn Estimator) -> bool {
        model.as_search().is_some()
    }

    pub fn obtain_trace_attributes(
        &self,
        model: &dyn Estimator,
    ) -> Result<Vec<(String, AttributeType)>, CodecError> {
        let results = search_of(model)?
            .search_results()
            .ok_or_else(|| CodecError::MissingSearchResults(model.class_name().to_string()))?;
        trace::trace_attributes(results)
    }

    pub fn extract_trace_data(
        &self,
        model: &dyn Estimator,
        repeat: usize,
        fold: usize,
    ) -> Result<Vec<TraceRow>, CodecError> {
        let results = search_of(model)?
            .search_results()
            .ok_or_else(|| CodecError::MissingSearchResults(model.class_name().to_string()))?;
        trace::extract_trace_data(results, repeat, fold)
    }

    /// The unfitted estimator of a search, configured with the parameters of
    /// one trace iteration.
    pub fn instantiate_model_from_hpo_class(
        &self,
        model: &dyn Estimator,
        iteration: &TraceRow,
    ) -> Result<Box<dyn Estimator>, CodecError> {
        let mut estimator = search_of(model)?.estimator().clone_box();
        estimator.set_params(iteration.get_parameters(&self.codec)?)?;
        Ok(estimator)
    }

    /// `<package>_<version>` for this crate and every installed package the
    /// registry knows, sorted by package name.
    pub fn version_information(&self) -> Vec<String> {
        let mut packages: Vec<(&str, &str)> = self
            .codec
            .registry()
            .packages()
            .filter(|(name, _)| *name != CODEC_PACKAGE)
            .collect();
        packages.sort_unstable();
        std::iter::once(format!("{}_{}", CODEC_PACKAGE, env!("CARGO_PKG_VERSION")))
            .chain(packages.into_iter().map(|(name, version)| format!("{}_{}", name, version)))
            .collect()
    }
}

fn search_of(model: &dyn Estimator) -> Result<&dyn HyperparameterSearch, CodecError> {
    model
        .as_search()
        .ok_or_else(|| CodecError::NotASearch(model.class_name().to_string()))
}

fn last_segment(name: &str) -> &str {
    name.rsplit("__").next().unwrap_or(name)
}

/// The first key of a grid (or list of grids) that names an `n_jobs` parameter.
fn tuned_n_jobs(space: &Value) -> Option<String> {
    match space {
        Value::List(grids) => grids.iter().find_map(tuned_n_jobs),
        other => other.as_mapping()?.iter().find_map(|(key, _)| {
            key.as_str()
                .filter(|name| last_segment(name) == N_JOBS)
                .map(str::to_string)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n_jobs_is_matched_on_the_last_segment() {
        assert_eq!(last_segment("estimator__n_jobs"), "n_jobs");
        assert_eq!(last_segment("n_jobs"), "n_jobs");
        let space = Value::List(vec![
            Value::dict([("alpha", Value::List(vec![]))]),
            Value::dict([("estimator__n_jobs", Value::List(vec![Value::Int(2)]))]),
        ]);
        assert_eq!(tuned_n_jobs(&space).as_deref(), Some("estimator__n_jobs"));
        assert_eq!(tuned_n_jobs(&Value::dict([("n_jobs_hint", Value::Null)])), None);
    }
}
