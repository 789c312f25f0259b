//! The flow descriptor and the machinery that builds, reconstructs and
//! flattens it.

use crate::error::CodecError;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

pub(crate) mod assembler;
pub(crate) mod builder;
pub(crate) mod deserializer;
pub(crate) mod parameters;

pub use parameters::ParameterSetting;

/// Optional documentation attached to a flow parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterMetaInfo {
    pub description: Option<String>,
    pub data_type: Option<String>,
}

/// Portable, versioned description of a model: its class, its hyper-parameters
/// as wire strings, and its nested sub-models as component flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    /// Assigned by an external registry once the flow is persisted.
    pub flow_id: Option<u64>,
    pub name: String,
    pub class_name: String,
    pub description: String,
    /// Parameter name to wire string. `None` marks a present but empty value.
    pub parameters: IndexMap<String, Option<String>>,
    pub parameters_meta_info: IndexMap<String, ParameterMetaInfo>,
    pub components: IndexMap<String, Flow>,
    pub external_version: String,
    pub dependencies: String,
    pub tags: Vec<String>,
    pub language: String,
}

impl Flow {
    /// Maps every flow name in the tree to the component identifiers leading
    /// to it from this flow. The root maps to an empty path.
    pub fn structure(&self) -> IndexMap<String, Vec<String>> {
        let mut structure = IndexMap::new();
        for (key, component) in &self.components {
            for (name, path) in component.structure() {
                let mut full = Vec::with_capacity(path.len() + 1);
                full.push(key.clone());
                full.extend(path);
                structure.insert(name, full);
            }
        }
        structure.insert(self.name.clone(), Vec::new());
        structure
    }

    /// Converts a parameter known by its owning flow's name into the
    /// `component__parameter` name accepted by the root model's `set_params`.
    pub fn parameter_path(&self, flow_name: &str, parameter: &str) -> Result<String, CodecError> {
        let structure = self.structure();
        let path = structure
            .get(flow_name)
            .ok_or_else(|| CodecError::UnknownFlowName(flow_name.to_string()))?;
        let mut parts: Vec<&str> = path.iter().map(String::as_str).collect();
        parts.push(parameter);
        Ok(parts.join("__"))
    }

    /// Fails unless this flow and every component carry a registry identity.
    pub fn ensure_identified(&self) -> Result<(), CodecError> {
        if self.flow_id.is_none() {
            return Err(CodecError::MissingIdentity(self.name.clone()));
        }
        self.components
            .values()
            .try_for_each(Flow::ensure_identified)
    }

    pub fn to_json(&self) -> Result<String, CodecError> {
        serde_json::to_string_pretty(self).map_err(|e| CodecError::InvalidJson(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, CodecError> {
        serde_json::from_str(text).map_err(|e| CodecError::InvalidJson(e.to_string()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        encode_to_vec(self, standard())
            .map_err(|e| CodecError::Storage(format!("Serialization failed: {}", e)))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        decode_from_slice(bytes, standard())
            .map(|(flow, _)| flow)
            .map_err(|e| CodecError::Storage(format!("Deserialization failed: {}", e)))
    }

    /// Saves the flow to a file in the bincode format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CodecError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        let mut file = fs::File::create(path).map_err(|e| {
            CodecError::Storage(format!("Could not create file '{}': {}", path.display(), e))
        })?;
        file.write_all(&bytes).map_err(|e| {
            CodecError::Storage(format!("Could not write to file '{}': {}", path.display(), e))
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CodecError> {
        let path = path.as_ref();
        let mut file = fs::File::open(path).map_err(|e| {
            CodecError::Storage(format!("Could not open file '{}': {}", path.display(), e))
        })?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| {
            CodecError::Storage(format!("Could not read from file '{}': {}", path.display(), e))
        })?;
        Self::from_bytes(&bytes)
    }
}
