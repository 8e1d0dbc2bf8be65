use crate::error::{AppError, Result};
use crate::ml::forest::ForestParams;
use crate::models::{AlertClass, FeatureName, N_CLASSES};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Encoded training data: feature matrix plus encoded alert labels
#[derive(Debug, Clone)]
pub struct TrainingDataset {
    /// Feature matrix (n_samples × n_features)
    pub features: Array2<f64>,

    /// Encoded labels (see [`AlertClass::encoded`])
    pub labels: Vec<usize>,

    /// Column names of `features`, in order
    pub feature_names: Vec<FeatureName>,
}

impl TrainingDataset {
    pub fn new(
        features: Array2<f64>,
        labels: Vec<usize>,
        feature_names: Vec<FeatureName>,
    ) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(AppError::Training(format!(
                "{} feature rows but {} labels",
                features.nrows(),
                labels.len()
            )));
        }
        if features.ncols() != feature_names.len() {
            return Err(AppError::Training(format!(
                "{} feature columns but {} feature names",
                features.ncols(),
                feature_names.len()
            )));
        }
        Ok(Self {
            features,
            labels,
            feature_names,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Rows selected by index, in the given order
    pub fn subset(&self, indices: &[usize]) -> TrainingDataset {
        TrainingDataset {
            features: self.features.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            feature_names: self.feature_names.clone(),
        }
    }

    /// Shuffled split into (train, test); the test side gets `ceil(n * test_size)` rows
    pub fn train_test_split(
        &self,
        test_size: f64,
        seed: u64,
    ) -> Result<(TrainingDataset, TrainingDataset)> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(AppError::Training(format!(
                "test_size must be in (0, 1), got {}",
                test_size
            )));
        }

        let n = self.n_samples();
        let n_test = (n as f64 * test_size).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(AppError::Training(format!(
                "cannot split {} samples with test_size {}",
                n, test_size
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut StdRng::seed_from_u64(seed));

        let (test_idx, train_idx) = indices.split_at(n_test);
        Ok((self.subset(train_idx), self.subset(test_idx)))
    }

    /// Sample count per alert code
    pub fn class_distribution(&self) -> BTreeMap<String, usize> {
        let mut distribution = BTreeMap::new();
        for &label in &self.labels {
            let key = AlertClass::from_encoded(label)
                .map(|c| c.code().to_string())
                .unwrap_or_else(|| format!("class_{}", label));
            *distribution.entry(key).or_insert(0) += 1;
        }
        distribution
    }
}

/// Model evaluation metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Accuracy
    pub accuracy: f64,

    /// Support-weighted precision
    pub precision: f64,

    /// Support-weighted recall
    pub recall: f64,

    /// Support-weighted F1 score
    pub f1_score: f64,

    /// Confusion matrix (rows = true class, columns = predicted class)
    pub confusion_matrix: Option<Array2<usize>>,

    /// Per-class metrics keyed by alert code
    pub per_class_metrics: BTreeMap<String, ClassMetrics>,
}

/// Per-class evaluation metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

impl ModelMetrics {
    pub fn new() -> Self {
        Self {
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1_score: 0.0,
            confusion_matrix: None,
            per_class_metrics: BTreeMap::new(),
        }
    }

    /// Compute metrics from encoded labels
    pub fn calculate(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Self {
        let n_samples = y_true.len();
        if n_samples == 0 {
            return Self::new();
        }

        let mut confusion = Array2::<usize>::zeros((n_classes, n_classes));
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t < n_classes && p < n_classes {
                confusion[[t, p]] += 1;
            }
        }

        let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
        let accuracy = correct as f64 / n_samples as f64;

        let mut per_class = BTreeMap::new();
        let mut precision = 0.0;
        let mut recall = 0.0;
        let mut f1_score = 0.0;

        for class_idx in 0..n_classes {
            let tp = confusion[[class_idx, class_idx]];
            let support: usize = confusion.row(class_idx).sum();
            let predicted: usize = confusion.column(class_idx).sum();

            let class_precision = if predicted > 0 {
                tp as f64 / predicted as f64
            } else {
                0.0
            };
            let class_recall = if support > 0 {
                tp as f64 / support as f64
            } else {
                0.0
            };
            let class_f1 = if class_precision + class_recall > 0.0 {
                2.0 * class_precision * class_recall / (class_precision + class_recall)
            } else {
                0.0
            };

            let weight = support as f64 / n_samples as f64;
            precision += weight * class_precision;
            recall += weight * class_recall;
            f1_score += weight * class_f1;

            let key = AlertClass::from_encoded(class_idx)
                .map(|c| c.code().to_string())
                .unwrap_or_else(|| format!("class_{}", class_idx));
            per_class.insert(
                key,
                ClassMetrics {
                    precision: class_precision,
                    recall: class_recall,
                    f1_score: class_f1,
                    support,
                },
            );
        }

        Self {
            accuracy,
            precision,
            recall,
            f1_score,
            confusion_matrix: Some(confusion),
            per_class_metrics: per_class,
        }
    }
}

impl Default for ModelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Support-weighted F1 score over the four alert classes
pub fn weighted_f1(y_true: &[usize], y_pred: &[usize]) -> f64 {
    ModelMetrics::calculate(y_true, y_pred, N_CLASSES).f1_score
}

/// Model metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name
    pub name: String,

    /// Crate version that produced the model
    pub version: String,

    /// Training timestamp
    pub trained_at: chrono::DateTime<chrono::Utc>,

    /// Number of training samples
    pub n_training_samples: usize,

    /// Number of features
    pub n_features: usize,

    /// Hyperparameters of the fitted forest
    pub hyperparameters: ForestParams,

    /// Mean cross-validated weighted F1 of the chosen configuration
    pub cv_score: Option<f64>,

    /// Training metrics
    pub training_metrics: ModelMetrics,

    /// Held-out test metrics
    pub validation_metrics: Option<ModelMetrics>,
}

impl ModelMetadata {
    pub fn new(hyperparameters: ForestParams) -> Self {
        Self {
            name: "Random Forest".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: chrono::Utc::now(),
            n_training_samples: 0,
            n_features: 0,
            hyperparameters,
            cv_score: None,
            training_metrics: ModelMetrics::new(),
            validation_metrics: None,
        }
    }
}
