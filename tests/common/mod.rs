//! Shared fixtures for the integration tests

#![allow(dead_code)]

use impactsense::{
    dataset::{clean_records, synthetic},
    ml::{train_and_evaluate, ForestParams, MaxFeatures, SearchSpace, TrainedModel, TrainingDataset},
    ml::FeatureOrder,
};

/// Cleaned synthetic dataset labelled by the risk rule
pub fn synthetic_dataset(n: usize, seed: u64) -> TrainingDataset {
    let records = synthetic::generate(n, seed).unwrap();
    clean_records(&records).unwrap().0
}

/// A grid small enough to search in a test
pub fn small_space() -> SearchSpace {
    SearchSpace {
        n_estimators: vec![10, 20],
        max_depth: vec![8, 0],
        min_samples_split: vec![2],
        min_samples_leaf: vec![1],
        max_features: vec![MaxFeatures::Sqrt],
        bootstrap: vec![true],
    }
}

pub fn small_params(seed: u64) -> ForestParams {
    ForestParams {
        n_estimators: 25,
        seed,
        ..ForestParams::default()
    }
}

/// A forest trained on synthetic data, ready to save or serve
pub fn trained_model(seed: u64) -> TrainedModel {
    let dataset = synthetic_dataset(400, seed);
    let (train, test) = dataset.train_test_split(0.2, seed).unwrap();
    let (classifier, _) = train_and_evaluate(small_params(seed), &train, &test).unwrap();
    TrainedModel::new(classifier, FeatureOrder::canonical()).unwrap()
}
