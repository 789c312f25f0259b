use thiserror::Error;

/// Errors raised while converting between runtime values, flows and models.
///
/// Every variant is fatal: the codec performs no retries and no partial recovery.
#[derive(Error, Debug, Clone)]
pub enum CodecError {
    #[error("Cannot serialize value of type {type_name}: {reason}")]
    UnsupportedType { type_name: String, reason: String },

    #[error("Can only use strings as mapping keys, found {type_name} for key '{key}'")]
    NonStringKey { key: String, type_name: String },

    #[error("Mapping key '{0}' is reserved for tagged objects")]
    ReservedKey(String),

    #[error("Type '{0}' is not part of the serializable type table")]
    UnknownTypeName(String),

    #[error("Malformed reference: {0}")]
    MalformedReference(String),

    #[error("Malformed step sequence in parameter '{parameter}' of {model}: {message}")]
    MalformedStep {
        model: String,
        parameter: String,
        message: String,
    },

    #[error("Found element shadowing official parameter for {model}: {identifier}")]
    ShadowedParameter { model: String, identifier: String },

    #[error(
        "Parameters of the model do not match the parameters expected by the flow:\nexpected flow parameters: {flow_parameters:?}\nmodel parameters: {model_parameters:?}"
    )]
    SchemaMismatch {
        flow_parameters: Vec<String>,
        model_parameters: Vec<String>,
    },

    #[error("Found a second occurrence of component {component} when trying to serialize {model}")]
    DuplicateComponent { component: String, model: String },

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error("Only {family} flows can be reinstantiated, found external version '{external_version}'")]
    VersionIncompatible {
        family: String,
        external_version: String,
    },

    #[error("Cannot resolve {kind} '{name}'")]
    UnknownSymbol { kind: SymbolKind, name: String },

    #[error("Flow '{0}' has no flow id; it must be registered before its parameters can be extracted")]
    MissingIdentity(String),

    #[error("Flow name '{0}' is not part of this flow's component tree")]
    UnknownFlowName(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Parameter '{name}' must be seeded with an integer or null, found {found}")]
    InvalidSeedState { name: String, found: String },

    #[error("{0} is not a hyper-parameter search")]
    NotASearch(String),

    #[error("{0} does not carry search results; fit it first")]
    MissingSearchResults(String),

    #[error("Invalid search space: {0}")]
    InvalidSearchSpace(String),

    #[error("Search results are inconsistent: {0}")]
    InconsistentSearchResults(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// The kind of symbol looked up in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Estimator,
    CrossValidator,
    Function,
    Package,
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SymbolKind::Estimator => "estimator class",
            SymbolKind::CrossValidator => "cross-validator class",
            SymbolKind::Function => "function",
            SymbolKind::Package => "package",
        };
        f.write_str(name)
    }
}

/// Errors raised while parsing or verifying a dependency manifest.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DependencyError {
    #[error("Cannot parse dependency '{0}'")]
    Unparseable(String),

    #[error("Operation '{operator}' is not supported in dependency '{line}'")]
    UnsupportedOperator { line: String, operator: String },

    #[error("Dependency '{0}' is not installed")]
    NotInstalled(String),

    #[error("Invalid version '{version}' for package '{name}'")]
    InvalidVersion { name: String, version: String },

    #[error("Trying to deserialize a model with dependency {line} not satisfied (installed: {installed})")]
    Unsatisfied { line: String, installed: String },
}

/// Errors raised by estimators and cross-validators themselves.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("{class_name} has no parameter named '{name}'")]
    UnknownParameter { class_name: String, name: String },

    #[error("Parameter '{name}' of {class_name} expects {expected}, but found {found}")]
    InvalidParameter {
        class_name: String,
        name: String,
        expected: &'static str,
        found: String,
    },

    #[error("{class_name} requires parameter '{name}'")]
    MissingParameter { class_name: String, name: String },

    #[error("{0} does not implement transform")]
    NotATransformer(String),

    #[error("{0} does not implement predict")]
    NotAPredictor(String),

    #[error("{0} has not been fitted")]
    NotFitted(String),

    #[error("Invalid training data: {0}")]
    InvalidData(String),

    #[error("Matrix is singular; cannot solve the normal equations")]
    SingularMatrix,
}

/// Errors raised while loading a codec configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
