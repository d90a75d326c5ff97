use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use foldwise_core::score::LogLoss;
use foldwise_core::{
    Dataset, GridSearch, KNearestNeighbors, LogisticRegression, ModelFamily, ParamGrid,
    Probabilities, Scorer, Splitter,
};
use std::sync::Arc;

fn rings(n_per_class: usize, n_classes: usize) -> Dataset {
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..n_per_class {
        let jitter = ((i * 13) % 17) as f64 / 17.0 - 0.5;
        for class in 0..n_classes {
            let angle = class as f64 * std::f64::consts::TAU / n_classes as f64;
            rows.push(vec![
                2.0 * angle.cos() + jitter,
                2.0 * angle.sin() + jitter * 0.3,
                jitter,
            ]);
            labels.push(class);
        }
    }
    let classes = (0..n_classes).map(|c| format!("c{c}")).collect();
    Dataset::new(classes, rows, labels).unwrap()
}

fn bench_splitting(c: &mut Criterion) {
    let data = rings(2000, 4);
    c.bench_function("k_fold_10_plain", |b| {
        let splitter = Splitter::k_fold(10);
        b.iter(|| splitter.split(black_box(&data), 7).unwrap())
    });
    c.bench_function("k_fold_10_stratified", |b| {
        let splitter = Splitter::k_fold(10).stratified(true);
        b.iter(|| splitter.split(black_box(&data), 7).unwrap())
    });
    c.bench_function("holdout_stratified", |b| {
        let splitter = Splitter::holdout(0.2).stratified(true);
        b.iter(|| splitter.split(black_box(&data), 7).unwrap())
    });
}

fn bench_log_loss(c: &mut Criterion) {
    let n = 10_000;
    let labels: Vec<usize> = (0..n).map(|i| i % 3).collect();
    let rows = (0..n)
        .map(|i| {
            let p = 0.5 + (i % 7) as f64 / 20.0;
            let rest = (1.0 - p) / 2.0;
            let mut row = vec![rest; 3];
            row[i % 3] = p;
            row
        })
        .collect();
    let predicted = Probabilities::new(vec![0, 1, 2], rows).unwrap();
    let scorer = LogLoss::default();
    c.bench_function("log_loss_10k_rows", |b| {
        b.iter(|| scorer.score(black_box(&labels), black_box(&predicted)).unwrap())
    });
}

fn bench_grid_search(c: &mut Criterion) {
    let data = rings(60, 3);
    let mut group = c.benchmark_group("grid_search");
    group.sample_size(10);
    let families: [(&str, Arc<dyn ModelFamily>, ParamGrid); 2] = [
        (
            "logistic",
            Arc::new(LogisticRegression),
            ParamGrid::new().param("C", [0.1, 1.0, 10.0]),
        ),
        (
            "knn",
            Arc::new(KNearestNeighbors),
            ParamGrid::new().param("n_neighbors", [1.0, 5.0, 15.0]),
        ),
    ];
    for (name, family, grid) in families {
        for workers in [1, 4] {
            let search = GridSearch::new(
                Arc::clone(&family),
                Arc::new(LogLoss::default()),
                grid.clone(),
                Splitter::k_fold(5).stratified(true),
            )
            .with_workers(workers);
            group.bench_with_input(BenchmarkId::new(name, workers), &data, |b, data| {
                b.iter(|| search.run(data, 11).unwrap())
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_splitting, bench_log_loss, bench_grid_search);
criterion_main!(benches);
