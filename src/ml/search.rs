//! Randomized hyperparameter search with stratified k-fold cross-validation.

use crate::error::{AppError, Result};
use crate::ml::forest::{ForestParams, MaxFeatures, RandomForest};
use crate::ml::models::{weighted_f1, TrainingDataset};
use crate::models::N_CLASSES;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Candidate values for each forest hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub n_estimators: Vec<usize>,

    /// `0` stands for unlimited depth
    pub max_depth: Vec<usize>,

    pub min_samples_split: Vec<usize>,

    pub min_samples_leaf: Vec<usize>,

    pub max_features: Vec<MaxFeatures>,

    pub bootstrap: Vec<bool>,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            n_estimators: vec![200, 300, 500],
            max_depth: vec![20, 30, 40, 0],
            min_samples_split: vec![2, 5],
            min_samples_leaf: vec![1, 2],
            max_features: vec![MaxFeatures::Sqrt],
            bootstrap: vec![true],
        }
    }
}

impl SearchSpace {
    /// Every combination in the grid, in a fixed order
    pub fn grid(&self, seed: u64) -> Result<Vec<ForestParams>> {
        if self.n_estimators.is_empty()
            || self.max_depth.is_empty()
            || self.min_samples_split.is_empty()
            || self.min_samples_leaf.is_empty()
            || self.max_features.is_empty()
            || self.bootstrap.is_empty()
        {
            return Err(AppError::Configuration(
                "every search dimension needs at least one value".to_string(),
            ));
        }

        let mut grid = Vec::new();
        for &n_estimators in &self.n_estimators {
            for &depth in &self.max_depth {
                for &min_samples_split in &self.min_samples_split {
                    for &min_samples_leaf in &self.min_samples_leaf {
                        for &max_features in &self.max_features {
                            for &bootstrap in &self.bootstrap {
                                grid.push(ForestParams {
                                    n_estimators,
                                    max_depth: (depth > 0).then_some(depth),
                                    min_samples_split,
                                    min_samples_leaf,
                                    max_features,
                                    bootstrap,
                                    seed,
                                });
                            }
                        }
                    }
                }
            }
        }
        Ok(grid)
    }
}

/// Cross-validated score of one sampled configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: ForestParams,
    pub mean_f1: f64,
    pub fold_scores: Vec<f64>,
}

/// Result of a randomized search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub best_params: ForestParams,
    pub best_score: f64,
    pub candidates: Vec<CandidateScore>,
}

/// Samples `n_iter` distinct grid points and scores each by mean weighted F1
#[derive(Debug, Clone)]
pub struct RandomizedSearch {
    space: SearchSpace,
    n_iter: usize,
    cv_folds: usize,
    seed: u64,
}

impl RandomizedSearch {
    pub fn new(space: SearchSpace, n_iter: usize, cv_folds: usize, seed: u64) -> Self {
        Self {
            space,
            n_iter,
            cv_folds,
            seed,
        }
    }

    /// Grid points drawn without replacement
    pub fn sample_candidates(&self) -> Result<Vec<ForestParams>> {
        if self.n_iter == 0 {
            return Err(AppError::Configuration("n_iter must be positive".to_string()));
        }
        let grid = self.space.grid(self.seed)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        Ok(grid
            .choose_multiple(&mut rng, self.n_iter.min(grid.len()))
            .cloned()
            .collect())
    }

    pub fn fit(&self, dataset: &TrainingDataset) -> Result<SearchOutcome> {
        let candidates = self.sample_candidates()?;
        let folds = stratified_folds(&dataset.labels, self.cv_folds, self.seed)?;

        info!(
            candidates = candidates.len(),
            folds = folds.len(),
            samples = dataset.n_samples(),
            "Starting randomized search"
        );

        let scored = candidates
            .into_par_iter()
            .map(|params| score_candidate(dataset, &folds, params))
            .collect::<Result<Vec<_>>>()?;

        // Highest mean F1 wins; ties keep the earlier sample
        let best = scored
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.mean_f1.total_cmp(&b.mean_f1).then(ib.cmp(ia)))
            .map(|(_, c)| c.clone())
            .ok_or_else(|| AppError::Training("search produced no candidates".to_string()))?;

        info!(best_score = best.mean_f1, params = %best.params, "Randomized search complete");

        Ok(SearchOutcome {
            best_params: best.params,
            best_score: best.mean_f1,
            candidates: scored,
        })
    }
}

fn score_candidate(
    dataset: &TrainingDataset,
    folds: &[Vec<usize>],
    params: ForestParams,
) -> Result<CandidateScore> {
    let n = dataset.n_samples();
    let mut fold_scores = Vec::with_capacity(folds.len());

    for test_idx in folds {
        let mut in_test = vec![false; n];
        for &i in test_idx {
            in_test[i] = true;
        }
        let train_idx: Vec<usize> = (0..n).filter(|&i| !in_test[i]).collect();

        let train = dataset.subset(&train_idx);
        let test = dataset.subset(test_idx);

        let forest = RandomForest::fit(train.features.view(), &train.labels, N_CLASSES, &params)?;
        let predictions = forest.predict(test.features.view())?;
        fold_scores.push(weighted_f1(&test.labels, &predictions));
    }

    let mean_f1 = fold_scores.iter().sum::<f64>() / fold_scores.len().max(1) as f64;
    debug!(params = %params, mean_f1, "Scored candidate");

    Ok(CandidateScore {
        params,
        mean_f1,
        fold_scores,
    })
}

/// Test-index sets for stratified k-fold CV.
///
/// Each class is shuffled and dealt round-robin across the folds, so class
/// proportions match in every fold and each sample is tested exactly once.
pub fn stratified_folds(labels: &[usize], k: usize, seed: u64) -> Result<Vec<Vec<usize>>> {
    if k < 2 {
        return Err(AppError::Configuration(format!(
            "cv_folds must be at least 2, got {}",
            k
        )));
    }
    if labels.len() < k {
        return Err(AppError::Training(format!(
            "{} samples cannot fill {} folds",
            labels.len(),
            k
        )));
    }

    let n_classes = labels.iter().max().map_or(0, |m| m + 1);
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &label) in labels.iter().enumerate() {
        by_class[label].push(i);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds = vec![Vec::new(); k];
    let mut next = 0;
    for members in by_class.iter_mut() {
        members.shuffle(&mut rng);
        for &i in members.iter() {
            folds[next % k].push(i);
            next += 1;
        }
    }

    for fold in folds.iter_mut() {
        fold.sort_unstable();
    }
    Ok(folds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureName;
    use ndarray::Array2;

    fn dataset(n: usize) -> TrainingDataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n {
            let class = i % N_CLASSES;
            let v = class as f64 * 3.0 + (i % 5) as f64 * 0.1;
            rows.extend_from_slice(&[v, 700.0 - v * 50.0, v, v, v * 100.0]);
            labels.push(class);
        }
        TrainingDataset::new(
            Array2::from_shape_vec((n, 5), rows).unwrap(),
            labels,
            FeatureName::canonical_order(),
        )
        .unwrap()
    }

    fn tiny_space() -> SearchSpace {
        SearchSpace {
            n_estimators: vec![3, 5],
            max_depth: vec![2, 0],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1, 2],
            max_features: vec![MaxFeatures::Sqrt, MaxFeatures::All],
            bootstrap: vec![true, false],
        }
    }

    #[test]
    fn test_default_grid_size() {
        let grid = SearchSpace::default().grid(42).unwrap();
        assert_eq!(grid.len(), 48);
        assert!(grid.iter().any(|p| p.max_depth.is_none()));
        assert!(grid.iter().all(|p| p.seed == 42));
    }

    #[test]
    fn test_empty_dimension_rejected() {
        let space = SearchSpace {
            bootstrap: vec![],
            ..SearchSpace::default()
        };
        assert!(space.grid(1).is_err());
    }

    #[test]
    fn test_candidates_distinct_and_seeded() {
        let search = RandomizedSearch::new(tiny_space(), 6, 3, 11);
        let a = search.sample_candidates().unwrap();
        let b = search.sample_candidates().unwrap();

        assert_eq!(a.len(), 6);
        assert_eq!(a, b);
        for (i, p) in a.iter().enumerate() {
            assert!(a[i + 1..].iter().all(|q| q != p));
        }
    }

    #[test]
    fn test_n_iter_capped_at_grid_size() {
        let search = RandomizedSearch::new(tiny_space(), 1000, 3, 11);
        assert_eq!(search.sample_candidates().unwrap().len(), 32);
    }

    #[test]
    fn test_stratified_folds_partition() {
        let labels: Vec<usize> = (0..103).map(|i| i % N_CLASSES).collect();
        let folds = stratified_folds(&labels, 5, 42).unwrap();

        assert_eq!(folds.len(), 5);
        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..103).collect::<Vec<_>>());

        for fold in &folds {
            assert!(fold.len() == 20 || fold.len() == 21);
            for class in 0..N_CLASSES {
                let count = fold.iter().filter(|&&i| labels[i] == class).count();
                assert!((5..=6).contains(&count));
            }
        }
    }

    #[test]
    fn test_stratified_folds_validation() {
        assert!(stratified_folds(&[0, 1, 2], 1, 0).is_err());
        assert!(stratified_folds(&[0, 1], 5, 0).is_err());
    }

    #[test]
    fn test_search_finds_good_model() {
        let data = dataset(80);
        let space = SearchSpace {
            max_depth: vec![0],
            ..tiny_space()
        };
        let search = RandomizedSearch::new(space, 4, 4, 42);
        let outcome = search.fit(&data).unwrap();

        assert_eq!(outcome.candidates.len(), 4);
        assert!(outcome.best_score > 0.9);
        assert!(outcome
            .candidates
            .iter()
            .all(|c| c.mean_f1 <= outcome.best_score && c.fold_scores.len() == 4));
    }
}
