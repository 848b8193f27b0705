use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use graph_feature_transform::{
    CategoricalEncoder, FeatureBatch, FeaturePipeline, MinMaxNormalizer, Partition,
    TransformConfig, TransformKind, TwoPhaseTransform,
};
use ndarray::Array2;
use std::collections::HashMap;

fn numeric_batch(rows: usize, cols: usize) -> FeatureBatch {
    let data = Array2::from_shape_fn((rows, cols), |(i, j)| ((i * 31 + j * 7) % 1000) as f32 * 0.01);
    FeatureBatch::from(data)
}

fn text_batch(rows: usize, vocab: usize) -> FeatureBatch {
    let records: Vec<String> = (0..rows)
        .map(|i| format!("t{},t{}", i % vocab, (i * 7) % vocab))
        .collect();
    FeatureBatch::from(records)
}

fn bench_minmax_apply(c: &mut Criterion) {
    for rows in [1_000usize, 10_000, 100_000].iter() {
        let batch = numeric_batch(*rows, 16);
        let mut norm = MinMaxNormalizer::new("x", "x");
        let partials = norm.pre_process(&batch).ok().flatten().into_iter().collect();
        norm.merge(partials).expect("Failed to merge extrema");

        c.bench_with_input(BenchmarkId::new("minmax_apply", rows), &batch, |b, batch| {
            b.iter(|| norm.apply(black_box(batch)).expect("Failed to apply"));
        });
    }
}

fn bench_categorical_pre_process(c: &mut Criterion) {
    for vocab in [16usize, 256, 4096].iter() {
        let batch = text_batch(20_000, *vocab);
        let encoder = CategoricalEncoder::new("t", "t")
            .with_separator(",")
            .expect("Failed to build encoder");

        c.bench_with_input(
            BenchmarkId::new("categorical_pre_process", vocab),
            &batch,
            |b, batch| {
                b.iter(|| encoder.pre_process(black_box(batch)));
            },
        );
    }
}

fn bench_categorical_apply(c: &mut Criterion) {
    for vocab in [16usize, 256, 4096].iter() {
        let batch = text_batch(20_000, *vocab);
        let mut encoder = CategoricalEncoder::new("t", "t")
            .with_separator(",")
            .expect("Failed to build encoder");
        let partials = encoder.pre_process(&batch).ok().flatten().into_iter().collect();
        encoder.merge(partials).expect("Failed to merge tokens");

        c.bench_with_input(BenchmarkId::new("categorical_apply", vocab), &batch, |b, batch| {
            b.iter(|| encoder.apply(black_box(batch)).expect("Failed to apply"));
        });
    }
}

fn bench_pipeline_run_local(c: &mut Criterion) {
    let configs = vec![
        TransformConfig::new("score").with_transform(TransformKind::MaxMinNorm {
            max_bound: None,
            min_bound: None,
        }),
        TransformConfig::new("tags").with_transform(TransformKind::ToCategorical {
            separator: Some(",".to_string()),
            mapping: None,
        }),
    ];

    for n_partitions in [1usize, 4, 16].iter() {
        let partitions: Vec<Partition> = (0..*n_partitions)
            .map(|_| {
                HashMap::from([
                    ("score".to_string(), numeric_batch(5_000, 8)),
                    ("tags".to_string(), text_batch(5_000, 64)),
                ])
            })
            .collect();

        c.bench_with_input(
            BenchmarkId::new("pipeline_run_local", n_partitions),
            &partitions,
            |b, partitions| {
                b.iter(|| {
                    let mut pipeline =
                        FeaturePipeline::from_configs(&configs).expect("Failed to build pipeline");
                    pipeline
                        .run_local(black_box(partitions))
                        .expect("Failed to run pipeline")
                });
            },
        );
    }
}

criterion_group!(
    benches,
    bench_minmax_apply,
    bench_categorical_pre_process,
    bench_categorical_apply,
    bench_pipeline_run_local
);
criterion_main!(benches);
