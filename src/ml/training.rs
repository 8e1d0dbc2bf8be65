//! End-to-end training: acquire, clean, split, search, refit, evaluate, save.

use crate::config::Config;
use crate::dataset::{clean_records, CleaningReport, DataAcquirer, DataOrigin};
use crate::error::{AppError, Result};
use crate::ml::artifacts::{ArtifactPaths, TrainedModel};
use crate::ml::classifier::train_and_evaluate;
use crate::ml::features::FeatureOrder;
use crate::ml::forest::ForestParams;
use crate::ml::models::ModelMetrics;
use crate::ml::search::{RandomizedSearch, SearchSpace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

/// Settings for one training run
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    acquirer: DataAcquirer,
    search: SearchSpace,
    n_iter: usize,
    cv_folds: usize,
    test_size: f64,
    seed: u64,
    paths: ArtifactPaths,
}

/// Summary of a finished training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub run_id: Uuid,
    pub origin: DataOrigin,
    pub cleaning: CleaningReport,
    pub class_distribution: BTreeMap<String, usize>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub best_params: ForestParams,
    pub cv_score: f64,
    pub test_metrics: ModelMetrics,
    pub artifacts: ArtifactPaths,
}

impl TrainingPipeline {
    pub fn from_config(config: &Config) -> Self {
        Self {
            acquirer: DataAcquirer::from_config(&config.data),
            search: config.training.search.clone(),
            n_iter: config.training.n_iter,
            cv_folds: config.training.cv_folds,
            test_size: config.training.test_size,
            seed: config.training.seed,
            paths: config.artifacts.paths(),
        }
    }

    pub fn with_acquirer(mut self, acquirer: DataAcquirer) -> Self {
        self.acquirer = acquirer;
        self
    }

    pub fn with_search(mut self, search: SearchSpace, n_iter: usize, cv_folds: usize) -> Self {
        self.search = search;
        self.n_iter = n_iter;
        self.cv_folds = cv_folds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_paths(mut self, paths: ArtifactPaths) -> Self {
        self.paths = paths;
        self
    }

    pub async fn run(self) -> Result<TrainingReport> {
        let data = self.acquirer.acquire().await?;
        info!(origin = %data.origin, rows = data.records.len(), "Acquired training data");

        let (dataset, cleaning) = clean_records(&data.records)?;
        let class_distribution = dataset.class_distribution();
        info!(distribution = ?class_distribution, "Class distribution");

        let (train, test) = dataset.train_test_split(self.test_size, self.seed)?;

        let search = RandomizedSearch::new(self.search, self.n_iter, self.cv_folds, self.seed);
        let paths = self.paths;

        // Search, refit and save are CPU and disk bound
        tokio::task::spawn_blocking(move || -> Result<TrainingReport> {
            let outcome = search.fit(&train)?;

            let (mut classifier, test_metrics) =
                train_and_evaluate(outcome.best_params.clone(), &train, &test)?;
            classifier.metadata_mut().cv_score = Some(outcome.best_score);

            info!(
                accuracy = test_metrics.accuracy,
                f1 = test_metrics.f1_score,
                "Held-out evaluation"
            );

            let model = TrainedModel::new(classifier, FeatureOrder::canonical())?;
            model.save(&paths)?;

            Ok(TrainingReport {
                run_id: model.run_id,
                origin: data.origin,
                cleaning,
                class_distribution,
                train_rows: train.n_samples(),
                test_rows: test.n_samples(),
                best_params: outcome.best_params,
                cv_score: outcome.best_score,
                test_metrics,
                artifacts: paths,
            })
        })
        .await
        .map_err(|e| AppError::Internal(format!("training task failed: {}", e)))?
    }
}
