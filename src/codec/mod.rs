//! Scalar, container and special-object encoding, and the [`Codec`] entry point.

use crate::config::{CODEC_PACKAGE, CodecConfig};
use crate::dependency;
use crate::error::{CodecError, DependencyError};
use crate::estimator::Estimator;
use crate::flow::assembler::FlowAssembler;
use crate::flow::deserializer::Decoder;
use crate::flow::parameters::{ParameterExtractor, ParameterSetting};
use crate::flow::Flow;
use crate::learnkit;
use crate::registry::{EstimatorFactory, Registry, SplitterFactory};
use crate::special::{
    CrossValidator, CrossValidatorRecord, DistributionFamily, DistributionRecord, FrozenDistribution,
    Function, SERIALIZED_OBJECT_KEY, SpecialObject,
};
use crate::value::Value;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

mod serialized;

pub use serialized::Serialized;
pub(crate) use serialized::json_to_wire;

/// Converts runtime values and models to flows and back.
///
/// A codec owns the symbol registry used to resolve class, distribution and
/// function names, and the configuration that shapes flow metadata.
pub struct Codec {
    registry: Registry,
    config: CodecConfig,
}

pub struct CodecBuilder {
    registry: Registry,
    config: CodecConfig,
    builtin: bool,
}

impl CodecBuilder {
    /// Starts from a registry holding the built-in `learnkit` family.
    pub fn new() -> Self {
        let mut registry = Registry::new();
        learnkit::register_defaults(&mut registry);
        Self {
            registry,
            config: CodecConfig::default(),
            builtin: true,
        }
    }

    /// Starts from an empty registry.
    pub fn bare() -> Self {
        Self {
            registry: Registry::new(),
            config: CodecConfig::default(),
            builtin: false,
        }
    }

    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_estimator(mut self, factory: Box<dyn EstimatorFactory>) -> Self {
        self.registry.register_estimator(factory);
        self
    }

    pub fn with_splitter(mut self, factory: Box<dyn SplitterFactory>) -> Self {
        self.registry.register_splitter(factory);
        self
    }

    pub fn with_distribution(mut self, family: Arc<dyn DistributionFamily>) -> Self {
        self.registry.register_distribution(family);
        self
    }

    pub fn with_function(mut self, function: Function) -> Self {
        self.registry.register_function(function);
        self
    }

    /// Declares an installed package version, used for external versions and
    /// dependency checks.
    pub fn with_package(mut self, name: &str, version: &str) -> Self {
        self.registry.register_package(name, version);
        self
    }

    pub fn build(mut self) -> Codec {
        self.registry
            .register_package_default(&self.config.family, &self.config.family_version);
        if self.builtin {
            self.registry
                .register_package_default(learnkit::FAMILY, learnkit::VERSION);
        }
        self.registry
            .register_package_default(CODEC_PACKAGE, env!("CARGO_PKG_VERSION"));
        Codec {
            registry: self.registry,
            config: self.config,
        }
    }
}

impl Default for CodecBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for Codec {
    fn default() -> Self {
        CodecBuilder::new().build()
    }
}

impl Codec {
    pub fn builder() -> CodecBuilder {
        CodecBuilder::new()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encodes a runtime value. Models become [`Serialized::Flow`].
    pub fn encode(&self, value: &Value) -> Result<Serialized, CodecError> {
        self.encode_at(value, 0)
    }

    /// Decodes a serialized value outside of any flow. Component references
    /// cannot be resolved here and are rejected.
    pub fn decode(&self, value: &Serialized) -> Result<Value, CodecError> {
        Decoder::new(self, false).decode(value, None, 0)
    }

    /// Decodes one wire string, parsing it as JSON when possible.
    pub fn decode_wire(&self, text: &str) -> Result<Value, CodecError> {
        self.decode(&Serialized::from_wire(text)?)
    }

    pub fn model_to_flow(&self, model: &dyn Estimator) -> Result<Flow, CodecError> {
        FlowAssembler::new(self).assemble(model, 0)
    }

    pub fn flow_to_model(&self, flow: &Flow) -> Result<Box<dyn Estimator>, CodecError> {
        Decoder::new(self, false).decode_flow(flow, 0)
    }

    /// Reconstructs the model with every defaulted hyper-parameter reset to
    /// its constructor default. Components are always kept.
    pub fn flow_to_model_with_defaults(&self, flow: &Flow) -> Result<Box<dyn Estimator>, CodecError> {
        Decoder::new(self, true).decode_flow(flow, 0)
    }

    pub fn flow_to_parameters(
        &self,
        flow: &Flow,
        model: &dyn Estimator,
    ) -> Result<Vec<ParameterSetting>, CodecError> {
        ParameterExtractor::new(self).extract(flow, model)
    }

    pub fn check_dependencies(&self, manifest: &str) -> Result<(), DependencyError> {
        dependency::check_dependencies(manifest, &self.registry)
    }

    pub(crate) fn encode_at(&self, value: &Value, depth: usize) -> Result<Serialized, CodecError> {
        Ok(match value {
            Value::Model(model) => {
                Serialized::Flow(Box::new(FlowAssembler::new(self).assemble(model.as_ref(), depth + 1)?))
            }
            Value::List(items) => Serialized::List(self.encode_all(items, depth)?),
            Value::Tuple(items) => Serialized::Tuple(self.encode_all(items, depth)?),
            Value::Null => Serialized::Null,
            Value::Bool(b) => Serialized::Bool(*b),
            Value::Int(i) => Serialized::Int(*i),
            Value::Float(f) if f.is_finite() => Serialized::Float(*f),
            Value::Float(f) => {
                return Err(CodecError::UnsupportedType {
                    type_name: "float".into(),
                    reason: format!("{} has no JSON representation", f),
                });
            }
            Value::Str(s) => Serialized::Str(s.clone()),
            Value::Scalar(scalar) => self.encode_at(&scalar.to_portable(), depth)?,
            Value::Dict(entries) => self.encode_mapping(entries, true, depth)?,
            Value::OrderedDict(entries) => self.encode_mapping(entries, false, depth)?,
            Value::Type(scalar_type) => {
                Serialized::Special(SpecialObject::Type(scalar_type.wire_name()?.to_string()))
            }
            Value::Distribution(dist) => self.encode_distribution(dist, depth)?,
            Value::Function(function) => {
                Serialized::Special(SpecialObject::Function(function.name().to_string()))
            }
            Value::CrossValidator(splitter) => self.encode_cross_validator(splitter.as_ref(), depth)?,
        })
    }

    fn encode_all(&self, items: &[Value], depth: usize) -> Result<Vec<Serialized>, CodecError> {
        items
            .iter()
            .map(|item| self.encode_at(item, depth + 1))
            .collect()
    }

    fn encode_mapping(
        &self,
        entries: &[(Value, Value)],
        canonicalize: bool,
        depth: usize,
    ) -> Result<Serialized, CodecError> {
        let mut keyed = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let Value::Str(key_str) = key else {
                return Err(CodecError::NonStringKey {
                    key: key.to_string(),
                    type_name: key.type_name().to_string(),
                });
            };
            if key_str == SERIALIZED_OBJECT_KEY {
                return Err(CodecError::ReservedKey(key_str.clone()));
            }
            keyed.push((key_str, value));
        }
        if canonicalize {
            keyed.sort_by(|a, b| a.0.cmp(b.0));
        }

        let mut encoded = IndexMap::with_capacity(keyed.len());
        for (key, value) in keyed {
            encoded.insert(key.clone(), self.encode_at(value, depth + 1)?);
        }
        Ok(Serialized::Map(encoded))
    }

    fn encode_distribution(
        &self,
        dist: &FrozenDistribution,
        depth: usize,
    ) -> Result<Serialized, CodecError> {
        let mut kwds = IndexMap::with_capacity(dist.kwds.len());
        for (name, value) in &dist.kwds {
            kwds.insert(name.clone(), self.encode_at(value, depth + 1)?);
        }
        Ok(Serialized::Special(SpecialObject::Distribution(DistributionRecord {
            dist: dist.name().to_string(),
            a: dist.a,
            b: dist.b,
            args: self.encode_all(&dist.args, depth)?,
            kwds,
        })))
    }

    fn encode_cross_validator(
        &self,
        splitter: &dyn CrossValidator,
        depth: usize,
    ) -> Result<Serialized, CodecError> {
        debug!(depth, class = splitter.class_name(), "encoding cross-validator");
        let deprecated = splitter.deprecated_params();
        let mut params: Vec<_> = splitter
            .get_params()
            .into_iter()
            .filter(|(name, _)| !deprecated.iter().any(|skipped| skipped == name))
            .collect();
        params.sort_by(|a, b| a.0.cmp(&b.0));

        let mut parameters = IndexMap::with_capacity(params.len());
        for (name, value) in params {
            let encoded = self.encode_at(&value, depth + 1)?;
            let wire = if encoded.is_empty_container() {
                None
            } else {
                Some(encoded.to_wire()?)
            };
            parameters.insert(name, wire);
        }
        Ok(Serialized::Special(SpecialObject::CrossValidator(CrossValidatorRecord {
            name: splitter.class_name().to_string(),
            parameters,
        })))
    }
}
