use crate::codec::Codec;
use crate::config::CODEC_PACKAGE;
use crate::error::CodecError;
use crate::estimator::Estimator;
use crate::flow::builder::{ComponentGraphBuilder, ExtractedModel, check_duplicate_components};
use crate::flow::Flow;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use tracing::info;

/// Builds a [`Flow`] from a live model, bottom-up: every component flow is
/// fully assembled before its parent.
pub(crate) struct FlowAssembler<'a> {
    codec: &'a Codec,
}

impl<'a> FlowAssembler<'a> {
    pub(crate) fn new(codec: &'a Codec) -> Self {
        Self { codec }
    }

    pub(crate) fn assemble(&self, model: &dyn Estimator, depth: usize) -> Result<Flow, CodecError> {
        let class_name = model.class_name().to_string();
        info!(depth, class = %class_name, "assembling flow");

        let extracted = ComponentGraphBuilder::new(self.codec, model, depth).extract()?;
        check_duplicate_components(model, &extracted.components)?;

        let name = display_name(&class_name, &extracted);
        let external_version = self.external_version(&class_name, &extracted.components)?;
        let config = self.codec.config();

        Ok(Flow {
            flow_id: None,
            name,
            class_name,
            description: config.flow_description(),
            parameters: extracted.parameters,
            parameters_meta_info: extracted.parameters_meta_info,
            components: extracted.components,
            external_version,
            dependencies: config.dependency_manifest(),
            tags: config.flow_tags(),
            language: config.language.clone(),
        })
    }

    /// Sorted, de-duplicated `package==version` entries of the model's own
    /// package, this codec, and every component.
    fn external_version(
        &self,
        class_name: &str,
        components: &IndexMap<String, Flow>,
    ) -> Result<String, CodecError> {
        let registry = self.codec.registry();
        let package = class_name.split('.').next().unwrap_or(class_name);

        let mut versions = BTreeSet::new();
        versions.insert(format!("{}=={}", package, registry.package_version(package)?));
        versions.insert(format!(
            "{}=={}",
            CODEC_PACKAGE,
            registry.package_version(CODEC_PACKAGE)?
        ));
        for component in components.values() {
            versions.extend(
                component
                    .external_version
                    .split(',')
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_string),
            );
        }
        Ok(versions.into_iter().collect::<Vec<_>>().join(","))
    }
}

/// `Class(key=Component,...)`, or just `Class` without components.
fn display_name(class_name: &str, extracted: &ExtractedModel) -> String {
    if extracted.components.is_empty() {
        return class_name.to_string();
    }
    let parts: Vec<String> = extracted
        .components
        .iter()
        .map(|(key, component)| {
            if extracted.explicit.contains(key) {
                format!("{}={}", key, component.name)
            } else {
                component.name.clone()
            }
        })
        .collect();
    format!("{}({})", class_name, parts.join(","))
}
