//! Criterion benchmarks for training and inference
//!
//! These benchmarks measure:
//! - Single-observation prediction latency
//! - Batch probability throughput
//! - Forest fitting at a few ensemble sizes

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use impactsense::{
    dataset::{clean_records, synthetic},
    ml::{
        train_and_evaluate, FeatureOrder, ForestParams, ImpactPredictor, RandomForest,
        TrainedModel, TrainingDataset,
    },
    models::{SeismicObservation, N_CLASSES},
};

fn dataset(n: usize) -> TrainingDataset {
    let records = synthetic::generate(n, 42).expect("synthetic data");
    clean_records(&records).expect("clean").0
}

fn predictor(n_estimators: usize) -> ImpactPredictor {
    let data = dataset(1000);
    let (train, test) = data.train_test_split(0.2, 42).expect("split");
    let params = ForestParams {
        n_estimators,
        ..ForestParams::default()
    };
    let (classifier, _) = train_and_evaluate(params, &train, &test).expect("train");
    let model = TrainedModel::new(classifier, FeatureOrder::canonical()).expect("model");
    ImpactPredictor::from(model)
}

fn bench_predict_single(c: &mut Criterion) {
    let predictor = predictor(200);
    let obs = SeismicObservation::new(5.8, 10.5, 4.2, 6.5, 450).expect("observation");

    c.bench_function("predict_single_200_trees", |b| {
        b.iter(|| predictor.predict(black_box(&obs)).expect("predict"));
    });
}

fn bench_predict_proba_batch(c: &mut Criterion) {
    let data = dataset(1000);
    let params = ForestParams {
        n_estimators: 100,
        ..ForestParams::default()
    };
    let forest =
        RandomForest::fit(data.features.view(), &data.labels, N_CLASSES, &params).expect("fit");

    let mut group = c.benchmark_group("predict_proba_batch");
    for rows in [10usize, 100, 1000] {
        let batch = data.subset(&(0..rows).collect::<Vec<_>>());
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &batch, |b, batch| {
            b.iter(|| forest.predict_proba(black_box(batch.features.view())).expect("proba"));
        });
    }
    group.finish();
}

fn bench_forest_fit(c: &mut Criterion) {
    let data = dataset(800);

    let mut group = c.benchmark_group("forest_fit");
    group.sample_size(10);
    for n_estimators in [10usize, 50, 200] {
        let params = ForestParams {
            n_estimators,
            ..ForestParams::default()
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(n_estimators),
            &params,
            |b, params| {
                b.iter(|| {
                    RandomForest::fit(data.features.view(), &data.labels, N_CLASSES, params)
                        .expect("fit")
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_predict_single,
    bench_predict_proba_batch,
    bench_forest_fit
);
criterion_main!(benches);
