use graph_feature_transform::{
    CategoricalEncoder, DType, Extrema, FeatureArray, FeatureBatch, FeaturePipeline, Partition,
    TransformConfig, TransformError, TwoPhaseTransform,
};
use ndarray::{array, Array1, Array2};
use proptest::prelude::*;
use std::collections::HashMap;

/// Deterministic pseudo-random values in roughly [-3, 3].
fn values(seed: u64, n: usize) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 11) as f64 / (1u64 << 53) as f64) * 6.0 - 3.0
        })
        .collect()
}

fn split_rows(data: &Array2<f64>, sizes: &[usize]) -> Vec<FeatureBatch> {
    let mut start = 0;
    sizes
        .iter()
        .map(|&n| {
            let part = data.slice(ndarray::s![start..start + n, ..]).to_owned();
            start += n;
            FeatureBatch::from(part)
        })
        .collect()
}

fn merge_then_apply<T: TwoPhaseTransform>(
    transform: &mut T,
    stats_parts: &[FeatureBatch],
    apply_parts: &[FeatureBatch],
) -> Vec<FeatureArray> {
    let partials = stats_parts
        .iter()
        .filter_map(|p| transform.pre_process(p).unwrap())
        .collect();
    transform.merge(partials).unwrap();
    apply_parts
        .iter()
        .map(|p| transform.apply(p).unwrap())
        .collect()
}

#[test]
fn numeric_bounds_scenario() {
    let mut raw = values(7, 100);
    raw[0] = 10.0;
    raw[1] = -10.0;
    let mut transform = graph_feature_transform::MinMaxNormalizer::new("test", "test")
        .with_bounds(Some(5.0), Some(-5.0))
        .unwrap();

    let batch = FeatureBatch::from(Array1::from(raw.clone()));
    let stats = transform.pre_process(&batch).unwrap().unwrap();
    assert_eq!(stats.max, array![5.0]);
    assert_eq!(stats.min, array![-5.0]);

    transform.merge(vec![stats]).unwrap();
    let out = transform.apply(&batch).unwrap().to_f64();
    assert_eq!(out[[0, 0]], 1.0);
    assert_eq!(out[[1, 0]], 0.0);
    for (x, v) in raw.iter().zip(out.iter()) {
        let expected = (x.clamp(-5.0, 5.0) + 5.0) / 10.0;
        assert!((v - expected).abs() < 1e-12);
    }
}

#[test]
fn repartitioned_apply_matches_single_partition() {
    let data = Array2::from_shape_vec((60, 4), values(11, 240)).unwrap();

    let mut split = graph_feature_transform::MinMaxNormalizer::new("f", "f");
    let stats_parts = split_rows(&data, &[10, 25, 25]);
    let apply_parts = split_rows(&data, &[30, 30]);
    let outputs = merge_then_apply(&mut split, &stats_parts, &apply_parts);

    let mut whole = graph_feature_transform::MinMaxNormalizer::new("f", "f");
    let single = [FeatureBatch::from(data.clone())];
    let reference = merge_then_apply(&mut whole, &single, &single);

    assert_eq!(split.params(), whole.params());
    let stacked = ndarray::concatenate(
        ndarray::Axis(0),
        &[outputs[0].to_f64().view(), outputs[1].to_f64().view()],
    )
    .unwrap();
    assert_eq!(stacked, reference[0].to_f64());
}

#[test]
fn output_width_follows_input_or_config() {
    let mut transform = graph_feature_transform::MinMaxNormalizer::new("f", "f");
    let f32_batch = FeatureBatch::from(array![[0.0f32], [2.0]]);
    let out = merge_then_apply(&mut transform, &[f32_batch.clone()], &[f32_batch.clone()]);
    assert_eq!(out[0].dtype(), DType::Float32);

    let mut half = graph_feature_transform::MinMaxNormalizer::new("f", "f")
        .with_out_dtype(DType::Float16);
    let out = merge_then_apply(&mut half, &[f32_batch.clone()], &[f32_batch]);
    assert_eq!(out[0].dtype(), DType::Float16);
}

#[test]
fn categorical_separator_scenario() {
    let mut transform = CategoricalEncoder::new("test1", "test")
        .with_separator(",")
        .unwrap();
    let batch = FeatureBatch::from(vec!["0,1", "2,3", "4,5"]);

    let tokens = transform.pre_process(&batch).unwrap().unwrap();
    let expected: Vec<String> = (0..6).map(|i| i.to_string()).collect();
    assert_eq!(tokens.iter().cloned().collect::<Vec<_>>(), expected);

    let vocab = transform.merge(vec![tokens]).unwrap().unwrap();
    let out = transform
        .apply(&FeatureBatch::from(vec!["0,1"]))
        .unwrap()
        .to_f64();
    for token in vocab.tokens() {
        let idx = vocab.index_of(token).unwrap();
        let expected = if token == "0" || token == "1" { 1.0 } else { 0.0 };
        assert_eq!(out[[0, idx]], expected);
    }
}

#[test]
fn persisted_mapping_is_reused_across_runs() {
    let config_json = r#"[
        {"feature_col": "genre", "feature_name": "genre_hot",
         "transform": {"name": "to_categorical"}},
        {"feature_col": "year", "out_dtype": "float16",
         "transform": {"name": "max_min_norm", "max_bound": 2020.0}}
    ]"#;
    let configs = TransformConfig::load_all(config_json).unwrap();

    let partitions: Vec<Partition> = vec![
        HashMap::from([
            ("genre".to_string(), FeatureBatch::from(vec!["rock", "pop"])),
            ("year".to_string(), FeatureBatch::from(array![1990.0f64, 2025.0])),
        ]),
        HashMap::from([
            ("genre".to_string(), FeatureBatch::from(vec!["jazz"])),
            ("year".to_string(), FeatureBatch::from(array![1970.0f64])),
        ]),
    ];

    let mut first = FeaturePipeline::from_configs(&configs).unwrap();
    let first_out = first.run_local(&partitions).unwrap();
    assert_eq!(first_out[0]["year"].dtype(), DType::Float16);
    let year = first_out[0]["year"].to_f64();
    assert!((year[[0, 0]] - 0.4).abs() < 1e-3);
    assert_eq!(year[[1, 0]], 1.0);

    let persisted = TransformConfig::to_json(&first.export_configs()).unwrap();
    let reloaded = TransformConfig::load_all(&persisted).unwrap();
    let mut second = FeaturePipeline::from_configs(&reloaded).unwrap();

    // The genre slot reports nothing; merging with it leaves the mapping alone.
    let phase_one = second.pre_process(&partitions[1]).unwrap();
    assert!(phase_one.get(0).is_none());
    second.merge(vec![phase_one]).unwrap();

    let second_out = second.apply(&partitions[0]).unwrap();
    assert_eq!(second_out["genre_hot"], first_out[0]["genre_hot"]);
}

#[test]
fn unknown_token_fails_apply() {
    let mut transform = CategoricalEncoder::new("g", "g");
    transform
        .merge(vec![["a".to_string()].into_iter().collect()])
        .unwrap();
    let err = transform
        .apply(&FeatureBatch::from(vec!["b"]))
        .unwrap_err();
    assert!(matches!(err, TransformError::UnknownToken { .. }));
}

fn extrema_strategy(cols: usize) -> impl Strategy<Value = Extrema> {
    (
        prop::collection::vec(-1e6f64..1e6, cols),
        prop::collection::vec(-1e6f64..1e6, cols),
    )
        .prop_map(|(max, min)| Extrema::from((Array1::from(max), Array1::from(min))))
}

proptest! {
    #[test]
    fn merge_is_order_independent(
        parts in prop::collection::vec(extrema_strategy(3), 1..8),
        rotate in 0usize..8,
    ) {
        let mut forward = graph_feature_transform::MinMaxNormalizer::new("f", "f");
        let a = forward.merge(parts.clone()).unwrap().unwrap();

        let mut shuffled = parts.clone();
        let len = shuffled.len();
        shuffled.rotate_left(rotate % len);
        shuffled.reverse();
        let mut backward = graph_feature_transform::MinMaxNormalizer::new("f", "f");
        let b = backward.merge(shuffled).unwrap().unwrap();

        prop_assert_eq!(a, b);
    }

    #[test]
    fn merge_is_associative(
        parts in prop::collection::vec(extrema_strategy(2), 2..8),
        split in 1usize..7,
    ) {
        let split = split.min(parts.len() - 1);
        let mut left = graph_feature_transform::MinMaxNormalizer::new("f", "f");
        let l = left.merge(parts[..split].to_vec()).unwrap().unwrap();
        let mut right = graph_feature_transform::MinMaxNormalizer::new("f", "f");
        let r = right.merge(parts[split..].to_vec()).unwrap().unwrap();

        let mut nested = graph_feature_transform::MinMaxNormalizer::new("f", "f");
        let n = nested
            .merge(vec![
                Extrema::from((l.max, l.min)),
                Extrema::from((r.max, r.min)),
            ])
            .unwrap()
            .unwrap();
        let mut flat = graph_feature_transform::MinMaxNormalizer::new("f", "f");
        let f = flat.merge(parts).unwrap().unwrap();

        prop_assert_eq!(n, f);
    }

    #[test]
    fn pre_process_reports_true_column_extrema(
        (rows, cols, data) in (1usize..12, 1usize..6).prop_flat_map(|(r, c)| {
            (Just(r), Just(c), prop::collection::vec(-1e9f64..1e9, r * c))
        }),
    ) {
        let values = Array2::from_shape_vec((rows, cols), data).unwrap();
        let transform = graph_feature_transform::MinMaxNormalizer::new("f", "f");
        let stats = transform
            .pre_process(&FeatureBatch::from(values.clone()))
            .unwrap()
            .unwrap();

        let max = values.fold_axis(ndarray::Axis(0), f64::NEG_INFINITY, |&a, &v| a.max(v));
        let min = values.fold_axis(ndarray::Axis(0), f64::INFINITY, |&a, &v| a.min(v));
        prop_assert_eq!(stats.max, max);
        prop_assert_eq!(stats.min, min);
    }

    #[test]
    fn applied_values_are_unit_interval(
        data in prop::collection::vec(-100.0f64..100.0, 1..64),
        probe in prop::collection::vec(-500.0f64..500.0, 1..64),
    ) {
        let mut transform = graph_feature_transform::MinMaxNormalizer::new("f", "f");
        let stats = transform
            .pre_process(&FeatureBatch::from(Array1::from(data)))
            .unwrap()
            .unwrap();
        transform.merge(vec![stats]).unwrap();

        let out = transform
            .apply(&FeatureBatch::from(Array1::from(probe)))
            .unwrap()
            .to_f64();
        for v in out.iter() {
            prop_assert!((0.0..=1.0).contains(v));
        }
    }

    #[test]
    fn vocabulary_covers_every_token(
        parts in prop::collection::vec(
            prop::collection::vec("[a-e]{1,2}", 0..6),
            1..5,
        ),
    ) {
        let mut transform = CategoricalEncoder::new("c", "c");
        let partials = parts
            .iter()
            .map(|p| transform.pre_process(&FeatureBatch::from(p.clone())).unwrap().unwrap())
            .collect::<Vec<_>>();
        let distinct: std::collections::BTreeSet<String> =
            parts.iter().flatten().cloned().collect();

        let vocab = transform.merge(partials).unwrap().unwrap();
        prop_assert_eq!(vocab.len(), distinct.len());
        let mut indices: Vec<usize> =
            distinct.iter().map(|t| vocab.index_of(t).unwrap()).collect();
        indices.sort_unstable();
        prop_assert_eq!(indices, (0..distinct.len()).collect::<Vec<_>>());

        for part in &parts {
            let out = transform.apply(&FeatureBatch::from(part.clone())).unwrap().to_f64();
            for row in out.rows() {
                prop_assert_eq!(row.sum(), 1.0);
            }
        }
    }
}
