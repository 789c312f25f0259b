use crate::error::{CodecError, ModelError, SymbolKind};
use crate::estimator::Estimator;
use crate::special::{CrossValidator, DistributionFamily, Function};
use crate::value::Params;
use ahash::AHashMap;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::marker::PhantomData;
use std::sync::Arc;

/// Constructs estimators of one class from keyword parameters.
pub trait EstimatorFactory: Send + Sync {
    fn class_name(&self) -> &str;

    /// Constructor parameters that have a default value, with that value.
    fn defaults(&self) -> Params;

    fn build(&self, params: Params) -> Result<Box<dyn Estimator>, ModelError>;
}

/// Constructs cross-validation splitters of one class from keyword parameters.
pub trait SplitterFactory: Send + Sync {
    fn class_name(&self) -> &str;

    fn build(&self, params: Params) -> Result<Box<dyn CrossValidator>, ModelError>;
}

/// Factory for any estimator with a `Default` constructor. Parameters listed
/// as required must be supplied on every build.
pub struct DefaultFactory<T> {
    class_name: String,
    required: &'static [&'static str],
    _marker: PhantomData<fn() -> T>,
}

impl<T: Estimator + Default + 'static> DefaultFactory<T> {
    pub fn new(required: &'static [&'static str]) -> Self {
        Self {
            class_name: T::default().class_name().to_string(),
            required,
            _marker: PhantomData,
        }
    }
}

impl<T: Estimator + Default + 'static> EstimatorFactory for DefaultFactory<T> {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn defaults(&self) -> Params {
        let mut params = T::default().get_params();
        params.retain(|name, _| !self.required.iter().any(|required| required == name));
        params
    }

    fn build(&self, params: Params) -> Result<Box<dyn Estimator>, ModelError> {
        if let Some(missing) = self.required.iter().find(|name| !params.contains_key(**name)) {
            return Err(ModelError::MissingParameter {
                class_name: self.class_name.clone(),
                name: missing.to_string(),
            });
        }
        let mut model = T::default();
        for (name, value) in params {
            model.set_param(&name, value)?;
        }
        Ok(Box::new(model))
    }
}

/// Factory for any splitter with a `Default` constructor.
pub struct DefaultSplitterFactory<T> {
    class_name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: CrossValidator + Default + 'static> DefaultSplitterFactory<T> {
    pub fn new() -> Self {
        Self {
            class_name: T::default().class_name().to_string(),
            _marker: PhantomData,
        }
    }
}

impl<T: CrossValidator + Default + 'static> Default for DefaultSplitterFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CrossValidator + Default + 'static> SplitterFactory for DefaultSplitterFactory<T> {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn build(&self, params: Params) -> Result<Box<dyn CrossValidator>, ModelError> {
        let mut splitter = T::default();
        for (name, value) in params {
            splitter.set_param(&name, value)?;
        }
        Ok(Box::new(splitter))
    }
}

/// Reports installed package versions to the dependency checker.
pub trait PackageIndex {
    fn installed_version(&self, package: &str) -> Option<&str>;
}

impl<S: BuildHasher> PackageIndex for HashMap<String, String, S> {
    fn installed_version(&self, package: &str) -> Option<&str> {
        self.get(package).map(String::as_str)
    }
}

/// Symbol tables that replace dynamic import: every class, distribution and
/// function a flow may name must be registered here.
#[derive(Default)]
pub struct Registry {
    estimators: AHashMap<String, Box<dyn EstimatorFactory>>,
    splitters: AHashMap<String, Box<dyn SplitterFactory>>,
    distributions: AHashMap<String, Arc<dyn DistributionFamily>>,
    functions: AHashMap<String, Function>,
    packages: AHashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_estimator(&mut self, factory: Box<dyn EstimatorFactory>) {
        self.estimators
            .insert(factory.class_name().to_string(), factory);
    }

    pub fn register_splitter(&mut self, factory: Box<dyn SplitterFactory>) {
        self.splitters
            .insert(factory.class_name().to_string(), factory);
    }

    pub fn register_distribution(&mut self, family: Arc<dyn DistributionFamily>) {
        self.distributions.insert(family.name().to_string(), family);
    }

    pub fn register_function(&mut self, function: Function) {
        self.functions.insert(function.name().to_string(), function);
    }

    pub fn register_package(&mut self, name: &str, version: &str) {
        self.packages.insert(name.to_string(), version.to_string());
    }

    /// Registers a package only if no version is known for it yet.
    pub fn register_package_default(&mut self, name: &str, version: &str) {
        self.packages
            .entry(name.to_string())
            .or_insert_with(|| version.to_string());
    }

    pub fn estimator(&self, class_name: &str) -> Result<&dyn EstimatorFactory, CodecError> {
        self.estimators
            .get(class_name)
            .map(|factory| &**factory)
            .ok_or_else(|| unknown(SymbolKind::Estimator, class_name))
    }

    pub fn splitter(&self, class_name: &str) -> Result<&dyn SplitterFactory, CodecError> {
        self.splitters
            .get(class_name)
            .map(|factory| &**factory)
            .ok_or_else(|| unknown(SymbolKind::CrossValidator, class_name))
    }

    /// Distribution lookups are optional: an unknown name is not an error.
    pub fn distribution(&self, name: &str) -> Option<Arc<dyn DistributionFamily>> {
        self.distributions.get(name).cloned()
    }

    pub fn function(&self, name: &str) -> Result<Function, CodecError> {
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| unknown(SymbolKind::Function, name))
    }

    pub fn package_version(&self, package: &str) -> Result<&str, CodecError> {
        self.installed_version(package)
            .ok_or_else(|| unknown(SymbolKind::Package, package))
    }

    pub fn packages(&self) -> impl Iterator<Item = (&str, &str)> {
        self.packages.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl PackageIndex for Registry {
    fn installed_version(&self, package: &str) -> Option<&str> {
        self.packages.get(package).map(String::as_str)
    }
}

fn unknown(kind: SymbolKind, name: &str) -> CodecError {
    CodecError::UnknownSymbol {
        kind,
        name: name.to_string(),
    }
}
