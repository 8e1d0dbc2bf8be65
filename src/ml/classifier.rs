use crate::error::{AppError, Result};
use crate::ml::forest::{ForestParams, RandomForest};
use crate::ml::models::{ModelMetadata, ModelMetrics, TrainingDataset};
use crate::models::N_CLASSES;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Trait for classifiers
pub trait Classifier: Send + Sync {
    /// Train the classifier
    fn train(&mut self, dataset: &TrainingDataset) -> Result<ModelMetrics>;

    /// Predict encoded class labels
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>>;

    /// Predict class probabilities (rows × classes)
    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>>;

    /// Get model metadata
    fn metadata(&self) -> &ModelMetadata;

    /// Number of input columns the model expects
    fn n_features(&self) -> usize;

    /// Check if model is trained
    fn is_trained(&self) -> bool;
}

/// Random forest over the four encoded alert classes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    /// Model metadata
    metadata: ModelMetadata,

    /// Hyperparameters used by the next `train`
    params: ForestParams,

    /// Fitted ensemble
    forest: Option<RandomForest>,
}

impl RandomForestClassifier {
    pub fn new(params: ForestParams) -> Self {
        Self {
            metadata: ModelMetadata::new(params.clone()),
            params,
            forest: None,
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn metadata_mut(&mut self) -> &mut ModelMetadata {
        &mut self.metadata
    }

    /// Fitted ensemble, if trained
    pub fn forest(&self) -> Option<&RandomForest> {
        self.forest.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn from_forest(forest: RandomForest) -> Self {
        let mut classifier = Self::new(forest.params().clone());
        classifier.forest = Some(forest);
        classifier
    }

    fn fitted(&self) -> Result<&RandomForest> {
        self.forest
            .as_ref()
            .ok_or_else(|| AppError::Inference("Model not trained".to_string()))
    }
}

impl Classifier for RandomForestClassifier {
    fn train(&mut self, dataset: &TrainingDataset) -> Result<ModelMetrics> {
        let forest = RandomForest::fit(
            dataset.features.view(),
            &dataset.labels,
            N_CLASSES,
            &self.params,
        )?;
        self.forest = Some(forest);

        let predictions = self.predict(&dataset.features)?;
        let metrics = ModelMetrics::calculate(&dataset.labels, &predictions, N_CLASSES);

        self.metadata.n_training_samples = dataset.n_samples();
        self.metadata.n_features = dataset.n_features();
        self.metadata.trained_at = chrono::Utc::now();
        self.metadata.hyperparameters = self.params.clone();
        self.metadata.training_metrics = metrics.clone();

        Ok(metrics)
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>> {
        self.fitted()?.predict(features.view())
    }

    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
        self.fitted()?.predict_proba(features.view())
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn n_features(&self) -> usize {
        self.forest.as_ref().map_or(0, |f| f.n_features())
    }

    fn is_trained(&self) -> bool {
        self.forest.is_some()
    }
}

/// Fit a classifier and report metrics on a held-out set
pub fn train_and_evaluate(
    params: ForestParams,
    train: &TrainingDataset,
    test: &TrainingDataset,
) -> Result<(RandomForestClassifier, ModelMetrics)> {
    let mut classifier = RandomForestClassifier::new(params);
    classifier.train(train)?;

    let predictions = classifier.predict(&test.features)?;
    let metrics = ModelMetrics::calculate(&test.labels, &predictions, N_CLASSES);
    classifier.metadata.validation_metrics = Some(metrics.clone());

    Ok((classifier, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::forest::MaxFeatures;
    use crate::models::FeatureName;

    fn create_test_dataset(n_samples: usize) -> TrainingDataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n_samples {
            let class = i % N_CLASSES;
            let base = class as f64 * 10.0;
            rows.extend_from_slice(&[base + (i % 3) as f64, 700.0 - base, base, base, base * 10.0]);
            labels.push(class);
        }
        TrainingDataset::new(
            Array2::from_shape_vec((n_samples, 5), rows).unwrap(),
            labels,
            FeatureName::canonical_order(),
        )
        .unwrap()
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_estimators: 10,
            max_features: MaxFeatures::Sqrt,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_random_forest_classifier() {
        let dataset = create_test_dataset(80);
        let mut classifier = RandomForestClassifier::new(small_params());

        assert!(!classifier.is_trained());
        assert_eq!(classifier.n_features(), 0);

        let metrics = classifier.train(&dataset).unwrap();

        assert!(classifier.is_trained());
        assert_eq!(classifier.n_features(), 5);
        assert!(metrics.accuracy > 0.95);
        assert_eq!(classifier.metadata().n_training_samples, 80);
    }

    #[test]
    fn test_untrained_predict_fails() {
        let classifier = RandomForestClassifier::new(small_params());
        let features = Array2::zeros((1, 5));
        assert!(classifier.predict(&features).is_err());
        assert!(classifier.predict_proba(&features).is_err());
    }

    #[test]
    fn test_predict_proba_shape() {
        let dataset = create_test_dataset(40);
        let mut classifier = RandomForestClassifier::new(small_params());
        classifier.train(&dataset).unwrap();

        let proba = classifier.predict_proba(&dataset.features).unwrap();
        assert_eq!(proba.shape(), &[40, N_CLASSES]);
    }

    #[test]
    fn test_train_and_evaluate_records_validation() {
        let dataset = create_test_dataset(100);
        let (train, test) = dataset.train_test_split(0.2, 42).unwrap();
        let (classifier, metrics) = train_and_evaluate(small_params(), &train, &test).unwrap();

        assert!(metrics.accuracy >= 0.0 && metrics.accuracy <= 1.0);
        assert_eq!(classifier.metadata().validation_metrics.as_ref(), Some(&metrics));
    }
}
