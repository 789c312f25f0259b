//! Cross-validation splitters and hyper-parameter search.

use crate::error::ModelError;
use crate::estimator::{Estimator, HyperparameterSearch};
use crate::learnkit::linear_model::Ridge;
use crate::learnkit::metrics::r2_score;
use crate::learnkit::{check_training_data, constructor_params, take, take_rows};
use crate::special::{CrossValidator, Fold, Function};
use crate::trace::SearchResults;
use crate::value::{Params, Value};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

fn rng_from(random_state: Option<i64>) -> StdRng {
    match random_state {
        Some(seed) => StdRng::seed_from_u64(seed as u64),
        None => StdRng::from_os_rng(),
    }
}

/// Consecutive folds, optionally over shuffled indices.
#[derive(Debug, Clone)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<i64>,
}

impl Default for KFold {
    fn default() -> Self {
        Self {
            n_splits: 3,
            shuffle: false,
            random_state: None,
        }
    }
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            ..Self::default()
        }
    }

    pub fn shuffle(mut self, random_state: Option<i64>) -> Self {
        self.shuffle = true;
        self.random_state = random_state;
        self
    }
}

impl CrossValidator for KFold {
    constructor_params!("learnkit.model_selection.KFold", [n_splits, shuffle, random_state]);

    fn split(&self, n_samples: usize) -> Vec<Fold> {
        if self.n_splits < 2 || n_samples < self.n_splits {
            return Vec::new();
        }
        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            indices.shuffle(&mut rng_from(self.random_state));
        }
        let base = n_samples / self.n_splits;
        let extra = n_samples % self.n_splits;
        let mut start = 0;
        (0..self.n_splits)
            .map(|fold| {
                let size = base + usize::from(fold < extra);
                let test = indices[start..start + size].to_vec();
                let train = indices[..start]
                    .iter()
                    .chain(&indices[start + size..])
                    .copied()
                    .collect();
                start += size;
                Fold { train, test }
            })
            .collect()
    }

    fn clone_box(&self) -> Box<dyn CrossValidator> {
        Box::new(self.clone())
    }
}

/// Independent random train/test partitions.
///
/// `n_iter` is the former name of `n_splits`; it is still honoured when set
/// but never encoded.
#[derive(Debug, Clone)]
pub struct ShuffleSplit {
    n_splits: usize,
    /// A fraction of the samples, or an absolute count when at least 1.
    test_size: f64,
    random_state: Option<i64>,
    n_iter: Option<usize>,
}

impl Default for ShuffleSplit {
    fn default() -> Self {
        Self {
            n_splits: 10,
            test_size: 0.1,
            random_state: None,
            n_iter: None,
        }
    }
}

impl ShuffleSplit {
    pub fn new(n_splits: usize, test_size: f64) -> Self {
        Self {
            n_splits,
            test_size,
            ..Self::default()
        }
    }

    pub fn random_state(mut self, random_state: Option<i64>) -> Self {
        self.random_state = random_state;
        self
    }
}

impl CrossValidator for ShuffleSplit {
    constructor_params!(
        "learnkit.model_selection.ShuffleSplit",
        [n_splits, test_size, random_state, n_iter]
    );

    fn deprecated_params(&self) -> &'static [&'static str] {
        &["n_iter"]
    }

    fn split(&self, n_samples: usize) -> Vec<Fold> {
        if n_samples < 2 {
            return Vec::new();
        }
        let n_test = if self.test_size >= 1.0 {
            self.test_size as usize
        } else {
            (self.test_size * n_samples as f64).ceil() as usize
        }
        .clamp(1, n_samples - 1);

        let mut rng = rng_from(self.random_state);
        let mut indices: Vec<usize> = (0..n_samples).collect();
        (0..self.n_iter.unwrap_or(self.n_splits))
            .map(|_| {
                indices.shuffle(&mut rng);
                Fold {
                    test: indices[..n_test].to_vec(),
                    train: indices[n_test..].to_vec(),
                }
            })
            .collect()
    }

    fn clone_box(&self) -> Box<dyn CrossValidator> {
        Box::new(self.clone())
    }
}

/// `cv` accepts null (three folds), a fold count or a splitter.
fn resolve_cv(class_name: &str, cv: &Value) -> Result<Box<dyn CrossValidator>, ModelError> {
    match cv {
        Value::Null => Ok(Box::new(KFold::default())),
        Value::CrossValidator(splitter) => Ok(splitter.clone()),
        other => match other.as_i64().map(usize::try_from) {
            Some(Ok(n_splits)) => Ok(Box::new(KFold::new(n_splits))),
            _ => Err(ModelError::InvalidParameter {
                class_name: class_name.to_string(),
                name: "cv".to_string(),
                expected: "null, a fold count or a cross-validator",
                found: other.type_name().to_string(),
            }),
        },
    }
}

/// The mappings of a search space: one mapping, or a list of them.
fn search_mappings<'v>(
    class_name: &str,
    name: &str,
    space: &'v Value,
) -> Result<Vec<Vec<(&'v str, &'v Value)>>, ModelError> {
    let invalid = |found: &Value| ModelError::InvalidParameter {
        class_name: class_name.to_string(),
        name: name.to_string(),
        expected: "a mapping or a list of mappings with string keys",
        found: found.type_name().to_string(),
    };
    let mappings: Vec<&[(Value, Value)]> = match space {
        Value::Dict(entries) | Value::OrderedDict(entries) => vec![entries.as_slice()],
        Value::List(items) => items
            .iter()
            .map(|item| item.as_mapping().ok_or_else(|| invalid(item)))
            .collect::<Result<_, _>>()?,
        other => return Err(invalid(other)),
    };
    mappings
        .into_iter()
        .map(|entries| {
            let mut axes = entries
                .iter()
                .map(|(key, value)| key.as_str().map(|key| (key, value)).ok_or_else(|| invalid(key)))
                .collect::<Result<Vec<_>, _>>()?;
            axes.sort_by(|a, b| a.0.cmp(b.0));
            Ok::<_, ModelError>(axes)
        })
        .collect()
}

/// Every combination of every grid, keys in sorted order.
fn expand_grid(class_name: &str, grid: &Value) -> Result<Vec<Params>, ModelError> {
    let mut candidates = Vec::new();
    for axes in search_mappings(class_name, "param_grid", grid)? {
        let mut values = Vec::with_capacity(axes.len());
        for (name, options) in &axes {
            values.push(options.as_sequence().ok_or_else(|| ModelError::InvalidParameter {
                class_name: class_name.to_string(),
                name: format!("param_grid[{}]", name),
                expected: "a list of candidate values",
                found: options.type_name().to_string(),
            })?);
        }
        if axes.is_empty() {
            candidates.push(Params::new());
            continue;
        }
        for combination in values.iter().map(|options| options.iter()).multi_cartesian_product() {
            candidates.push(
                axes.iter()
                    .map(|(name, _)| name.to_string())
                    .zip(combination.into_iter().cloned())
                    .collect(),
            );
        }
    }
    Ok(candidates)
}

/// `n_iter` draws; each picks one mapping, then samples every key from its
/// distribution or list.
fn sample_candidates(
    class_name: &str,
    space: &Value,
    n_iter: usize,
    rng: &mut StdRng,
) -> Result<Vec<Params>, ModelError> {
    let mappings = search_mappings(class_name, "param_distributions", space)?;
    if mappings.is_empty() {
        return Ok(Vec::new());
    }
    let mut candidates = Vec::with_capacity(n_iter);
    for _ in 0..n_iter {
        let axes = &mappings[rng.random_range(0..mappings.len())];
        let mut candidate = Params::new();
        for (name, source) in axes {
            let value = match source {
                Value::Distribution(dist) => dist.rvs(rng),
                other => match other.as_sequence() {
                    Some(options) if !options.is_empty() => {
                        options[rng.random_range(0..options.len())].clone()
                    }
                    _ => {
                        return Err(ModelError::InvalidParameter {
                            class_name: class_name.to_string(),
                            name: format!("param_distributions[{}]", name),
                            expected: "a distribution or a non-empty list",
                            found: other.type_name().to_string(),
                        });
                    }
                },
            };
            candidate.insert(name.to_string(), value);
        }
        candidates.push(candidate);
    }
    Ok(candidates)
}

/// Shared search settings, borrowed from either search model.
struct SearchRun<'a> {
    class_name: &'a str,
    estimator: &'a dyn Estimator,
    scoring: Option<&'a Function>,
    cv: &'a Value,
    refit: bool,
}

impl SearchRun<'_> {
    fn score(&self, y_true: &[f64], y_pred: &[f64]) -> f64 {
        match self.scoring {
            Some(scorer) => scorer.call(y_true, y_pred),
            None => r2_score(y_true, y_pred),
        }
    }

    fn run(
        &self,
        candidates: &[Params],
        x: &[Vec<f64>],
        y: &[f64],
    ) -> Result<(SearchResults, Option<Box<dyn Estimator>>), ModelError> {
        check_training_data(x, y)?;
        if candidates.is_empty() {
            return Err(ModelError::InvalidData("the search space is empty".to_string()));
        }
        let folds = resolve_cv(self.class_name, self.cv)?.split(x.len());
        if folds.is_empty() {
            return Err(ModelError::InvalidData(format!(
                "cannot split {} samples into folds",
                x.len()
            )));
        }

        let mut results = SearchResults::default();
        let mut best_score = f64::NEG_INFINITY;
        for (iteration, candidate) in candidates.iter().enumerate() {
            let mut total = 0.0;
            for fold in &folds {
                let mut model = self.estimator.clone_box();
                model.set_params(candidate.clone())?;
                model.fit(&take_rows(x, &fold.train), &take(y, &fold.train))?;
                let pred = model.predict(&take_rows(x, &fold.test))?;
                total += self.score(&take(y, &fold.test), &pred);
            }
            let mean = total / folds.len() as f64;
            debug!(iteration, score = mean, "evaluated candidate");

            if mean > best_score {
                best_score = mean;
                results.best_index = iteration;
            }
            results.mean_test_score.push(mean);
            for (name, value) in candidate {
                results
                    .params
                    .entry(name.clone())
                    .or_insert_with(|| vec![None; iteration])
                    .push(Some(value.clone()));
            }
            for cells in results.params.values_mut() {
                if cells.len() == iteration {
                    cells.push(None);
                }
            }
        }

        let best = if self.refit {
            let mut model = self.estimator.clone_box();
            model.set_params(candidates[results.best_index].clone())?;
            model.fit(x, y)?;
            Some(model)
        } else {
            None
        };
        Ok((results, best))
    }
}

/// Exhaustive search over a parameter grid.
#[derive(Debug, Clone)]
pub struct GridSearchCv {
    estimator: Box<dyn Estimator>,
    param_grid: Value,
    scoring: Option<Function>,
    n_jobs: Option<i64>,
    refit: bool,
    cv: Value,
    results: Option<SearchResults>,
    best_estimator: Option<Box<dyn Estimator>>,
}

impl Default for GridSearchCv {
    fn default() -> Self {
        Self {
            estimator: Box::new(Ridge::default()),
            param_grid: Value::Dict(Vec::new()),
            scoring: None,
            n_jobs: None,
            refit: true,
            cv: Value::Null,
            results: None,
            best_estimator: None,
        }
    }
}

impl GridSearchCv {
    pub fn new(estimator: impl Estimator + 'static, param_grid: Value) -> Self {
        Self {
            estimator: Box::new(estimator),
            param_grid,
            ..Self::default()
        }
    }

    pub fn cv(mut self, cv: Value) -> Self {
        self.cv = cv;
        self
    }

    pub fn scoring(mut self, scoring: Option<Function>) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn n_jobs(mut self, n_jobs: Option<i64>) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn best_estimator(&self) -> Option<&dyn Estimator> {
        self.best_estimator.as_deref()
    }
}

impl Estimator for GridSearchCv {
    constructor_params!(
        "learnkit.model_selection.GridSearchCv",
        [estimator, param_grid, scoring, n_jobs, refit, cv]
    );

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        let candidates = expand_grid(self.class_name(), &self.param_grid)?;
        let run = SearchRun {
            class_name: self.class_name(),
            estimator: self.estimator.as_ref(),
            scoring: self.scoring.as_ref(),
            cv: &self.cv,
            refit: self.refit,
        };
        let (results, best) = run.run(&candidates, x, y)?;
        self.results = Some(results);
        self.best_estimator = best;
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        self.best_estimator
            .as_ref()
            .ok_or_else(|| ModelError::NotFitted(self.class_name().to_string()))?
            .predict(x)
    }

    fn as_search(&self) -> Option<&dyn HyperparameterSearch> {
        Some(self)
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }
}

impl HyperparameterSearch for GridSearchCv {
    fn estimator(&self) -> &dyn Estimator {
        self.estimator.as_ref()
    }

    fn search_space(&self) -> &Value {
        &self.param_grid
    }

    fn search_results(&self) -> Option<&SearchResults> {
        self.results.as_ref()
    }
}

/// Search over `n_iter` candidates sampled from distributions and lists.
#[derive(Debug, Clone)]
pub struct RandomizedSearchCv {
    estimator: Box<dyn Estimator>,
    param_distributions: Value,
    n_iter: usize,
    scoring: Option<Function>,
    n_jobs: Option<i64>,
    refit: bool,
    cv: Value,
    random_state: Option<i64>,
    results: Option<SearchResults>,
    best_estimator: Option<Box<dyn Estimator>>,
}

impl Default for RandomizedSearchCv {
    fn default() -> Self {
        Self {
            estimator: Box::new(Ridge::default()),
            param_distributions: Value::Dict(Vec::new()),
            n_iter: 10,
            scoring: None,
            n_jobs: None,
            refit: true,
            cv: Value::Null,
            random_state: None,
            results: None,
            best_estimator: None,
        }
    }
}

impl RandomizedSearchCv {
    pub fn new(estimator: impl Estimator + 'static, param_distributions: Value) -> Self {
        Self {
            estimator: Box::new(estimator),
            param_distributions,
            ..Self::default()
        }
    }

    pub fn n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    pub fn cv(mut self, cv: Value) -> Self {
        self.cv = cv;
        self
    }

    pub fn scoring(mut self, scoring: Option<Function>) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn random_state(mut self, random_state: Option<i64>) -> Self {
        self.random_state = random_state;
        self
    }

    pub fn best_estimator(&self) -> Option<&dyn Estimator> {
        self.best_estimator.as_deref()
    }
}

impl Estimator for RandomizedSearchCv {
    constructor_params!(
        "learnkit.model_selection.RandomizedSearchCv",
        [estimator, param_distributions, n_iter, scoring, n_jobs, refit, cv, random_state]
    );

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        let mut rng = rng_from(self.random_state);
        let candidates = sample_candidates(
            self.class_name(),
            &self.param_distributions,
            self.n_iter,
            &mut rng,
        )?;
        let run = SearchRun {
            class_name: self.class_name(),
            estimator: self.estimator.as_ref(),
            scoring: self.scoring.as_ref(),
            cv: &self.cv,
            refit: self.refit,
        };
        let (results, best) = run.run(&candidates, x, y)?;
        self.results = Some(results);
        self.best_estimator = best;
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        self.best_estimator
            .as_ref()
            .ok_or_else(|| ModelError::NotFitted(self.class_name().to_string()))?
            .predict(x)
    }

    fn as_search(&self) -> Option<&dyn HyperparameterSearch> {
        Some(self)
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }
}

impl HyperparameterSearch for RandomizedSearchCv {
    fn estimator(&self) -> &dyn Estimator {
        self.estimator.as_ref()
    }

    fn search_space(&self) -> &Value {
        &self.param_distributions
    }

    fn search_results(&self) -> Option<&SearchResults> {
        self.results.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y = x.iter().map(|row| 1.5 * row[0] - row[1]).collect();
        (x, y)
    }

    #[test]
    fn kfold_partitions_every_index_once() {
        let folds = KFold::new(3).split(7);
        assert_eq!(folds.len(), 3);
        assert_eq!(folds[0].test, vec![0, 1, 2]);
        assert_eq!(folds[2].test, vec![5, 6]);
        let mut tested: Vec<usize> = folds.iter().flat_map(|f| f.test.clone()).collect();
        tested.sort_unstable();
        assert_eq!(tested, (0..7).collect::<Vec<_>>());
        assert!(KFold::new(3).split(2).is_empty());
    }

    #[test]
    fn shuffled_kfold_is_reproducible() {
        let a = KFold::new(4).shuffle(Some(5)).split(20);
        let b = KFold::new(4).shuffle(Some(5)).split(20);
        assert_eq!(a, b);
    }

    #[test]
    fn shuffle_split_honours_the_deprecated_name() {
        let mut splitter = ShuffleSplit::new(5, 0.25).random_state(Some(1));
        splitter.set_param("n_iter", Value::Int(2)).unwrap();
        let folds = splitter.split(8);
        assert_eq!(folds.len(), 2);
        assert!(folds.iter().all(|f| f.test.len() == 2 && f.train.len() == 6));
        assert_eq!(splitter.deprecated_params(), &["n_iter"]);
    }

    #[test]
    fn grid_expands_sorted_keys() {
        let grid = Value::dict([
            ("fit_intercept", Value::List(vec![Value::Bool(true), Value::Bool(false)])),
            ("alpha", Value::List(vec![Value::Float(0.1), Value::Float(1.0)])),
        ]);
        let candidates = expand_grid("Test", &grid).unwrap();
        assert_eq!(candidates.len(), 4);
        let names: Vec<&str> = candidates[0].keys().map(String::as_str).collect();
        assert_eq!(names, ["alpha", "fit_intercept"]);
        assert_eq!(candidates[1]["fit_intercept"], Value::Bool(false));
    }

    #[test]
    fn grid_search_records_one_iteration_per_candidate() {
        let (x, y) = data();
        let grid = Value::List(vec![
            Value::dict([("alpha", Value::List(vec![Value::Float(0.01), Value::Float(100.0)]))]),
            Value::dict([
                ("alpha", Value::List(vec![Value::Float(100.0)])),
                ("fit_intercept", Value::List(vec![Value::Bool(false)])),
            ]),
        ]);
        let mut search = GridSearchCv::new(Ridge::default(), grid).cv(Value::Int(3));
        search.fit(&x, &y).unwrap();

        let results = search.search_results().unwrap();
        assert_eq!(results.n_iterations(), 3);
        assert_eq!(results.best_index, 0);
        assert_eq!(results.params["alpha"][2], Some(Value::Float(100.0)));
        assert_eq!(results.params["fit_intercept"], vec![None, None, Some(Value::Bool(false))]);
        assert!(search.best_estimator().is_some());
        assert!(search.predict(&x).is_ok());
    }

    #[test]
    fn randomized_search_is_reproducible_with_a_seed() {
        let (x, y) = data();
        let space = Value::dict([("alpha", Value::List(vec![Value::Float(0.1), Value::Float(1.0), Value::Float(10.0)]))]);
        let mut a = RandomizedSearchCv::new(Ridge::default(), space).n_iter(4).random_state(Some(9));
        let mut b = a.clone();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.search_results(), b.search_results());
    }

    #[test]
    fn cv_must_be_a_count_or_splitter() {
        assert!(resolve_cv("Test", &Value::Int(4)).is_ok());
        assert!(resolve_cv("Test", &Value::CrossValidator(Box::new(KFold::default()))).is_ok());
        assert!(matches!(
            resolve_cv("Test", &Value::Str("five".into())),
            Err(ModelError::InvalidParameter { .. })
        ));
    }
}
