use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name this crate reports in external versions, dependency manifests and tags.
pub const CODEC_PACKAGE: &str = "modelflow";

/// Settings that shape the metadata of every assembled flow.
///
/// All fields have defaults, so an empty TOML document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Model family whose flows this codec reconstructs.
    pub family: String,
    pub family_version: String,
    /// Manifest lines appended after `family==family_version`.
    pub extra_dependencies: Vec<String>,
    /// Flow description; derived from the family when absent.
    pub description: Option<String>,
    pub language: String,
    /// Tags appended after the standard ones.
    pub tags: Vec<String>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            family: "learnkit".to_string(),
            family_version: env!("CARGO_PKG_VERSION").to_string(),
            extra_dependencies: vec![format!(
                "{}>={}",
                CODEC_PACKAGE,
                env!("CARGO_PKG_VERSION")
            )],
            description: None,
            language: "English".to_string(),
            tags: Vec::new(),
        }
    }
}

impl CodecConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// `family==version` as it appears in external versions.
    pub fn family_marker(&self) -> String {
        format!("{}=={}", self.family, self.family_version)
    }

    /// Newline-joined constraint lines stored in every flow.
    pub fn dependency_manifest(&self) -> String {
        std::iter::once(self.family_marker())
            .chain(self.extra_dependencies.iter().cloned())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn flow_description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("Automatically created {} flow.", self.family))
    }

    pub fn flow_tags(&self) -> Vec<String> {
        let mut tags = vec![
            CODEC_PACKAGE.to_string(),
            self.family.clone(),
            "rust".to_string(),
            self.family_marker().replace("==", "_"),
        ];
        tags.extend(self.tags.iter().cloned());
        tags
    }
}
