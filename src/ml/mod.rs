/// Earthquake impact classification
///
/// This module provides:
/// - A random-forest classifier over the five seismic features
/// - Randomized hyperparameter search with stratified cross-validation
/// - Paired model and feature-order artifacts
/// - Inference with a rule-based fallback and contribution scores

pub mod artifacts;
pub mod classifier;
pub mod features;
pub mod forest;
pub mod models;
pub mod rules;
pub mod search;
pub mod service;
pub mod training;

pub use artifacts::{ArtifactPaths, TrainedModel};
pub use classifier::{train_and_evaluate, Classifier, RandomForestClassifier};
pub use features::{feature_contributions, FeatureContribution, FeatureOrder};
pub use forest::{ForestParams, MaxFeatures, RandomForest};
pub use models::{ClassMetrics, ModelMetadata, ModelMetrics, TrainingDataset};
pub use rules::{risk_score, rule_based_alert};
pub use search::{RandomizedSearch, SearchOutcome, SearchSpace};
pub use service::{global_predictor, ImpactPredictor, PredictionResult, PredictionSource};
pub use training::{TrainingPipeline, TrainingReport};
