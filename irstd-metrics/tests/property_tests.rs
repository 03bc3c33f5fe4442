//! Property-based tests using proptest
//!
//! These tests check the counting invariants and the batch-split independence of the
//! accumulators over random masks and score maps.

use burn::{backend::NdArray, tensor::Tensor};
use irstd_metrics::{
    metrics::{batch_intersection_union, batch_pix_accuracy},
    RocMetric, SigmoidMetric,
};
use proptest::prelude::*;

type TestBackend = NdArray<f32>;

const SIDE: usize = 6;

fn plane(values: &[f32]) -> Tensor<TestBackend, 2> {
    Tensor::<TestBackend, 1>::from_floats(values, &Default::default()).reshape([SIDE, SIDE])
}

fn frames(values: &[f32], count: usize) -> Tensor<TestBackend, 3> {
    Tensor::<TestBackend, 1>::from_floats(values, &Default::default())
        .reshape([count, SIDE, SIDE])
}

fn binary_plane() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(prop::bool::ANY, SIDE * SIDE)
        .prop_map(|bits| bits.into_iter().map(|b| if b { 1.0 } else { 0.0 }).collect())
}

fn score_frames(count: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-4.0f32..4.0, count * SIDE * SIDE)
}

fn mask_frames(count: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(prop::bool::weighted(0.3), count * SIDE * SIDE)
        .prop_map(|bits| bits.into_iter().map(|b| if b { 1.0 } else { 0.0 }).collect())
}

// Property: intersection never exceeds union
proptest! {
    #[test]
    fn prop_intersection_within_union(pred in binary_plane(), mask in binary_plane()) {
        let (inter, union) =
            batch_intersection_union(plane(&pred), plane(&mask), 0.5).unwrap();
        prop_assert!(inter <= union, "intersection {} > union {}", inter, union);
    }

    #[test]
    fn prop_correct_within_foreground(
        scores in prop::collection::vec(0.0f32..1.0, SIDE * SIDE),
        mask in binary_plane()
    ) {
        let foreground = mask.iter().filter(|&&v| v > 0.0).count() as u64;
        let (correct, labeled) = batch_pix_accuracy(plane(&scores), plane(&mask), 0.5).unwrap();

        prop_assert_eq!(labeled, foreground);
        prop_assert!(correct <= labeled, "correct {} > labeled {}", correct, labeled);
    }
}

// Property: splitting a batch into two updates does not change the result
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_pixel_metric_split_invariant(
        scores in prop::collection::vec(0.0f32..1.0, 2 * SIDE * SIDE),
        masks in mask_frames(2)
    ) {
        let half = SIDE * SIDE;

        let mut whole = SigmoidMetric::<TestBackend>::new();
        whole.update(frames(&scores, 2), frames(&masks, 2)).unwrap();

        let mut split = SigmoidMetric::<TestBackend>::new();
        split.update(frames(&scores[..half], 1), frames(&masks[..half], 1)).unwrap();
        split.update(frames(&scores[half..], 1), frames(&masks[half..], 1)).unwrap();

        prop_assert_eq!(whole.get(), split.get());
    }

    #[test]
    fn prop_roc_metric_split_invariant(scores in score_frames(2), masks in mask_frames(2)) {
        let half = SIDE * SIDE;

        let mut whole = RocMetric::<TestBackend>::new(4).unwrap();
        whole.update(frames(&scores, 2), frames(&masks, 2)).unwrap();

        let mut split = RocMetric::<TestBackend>::new(4).unwrap();
        split.update(frames(&scores[..half], 1), frames(&masks[..half], 1)).unwrap();
        split.update(frames(&scores[half..], 1), frames(&masks[half..], 1)).unwrap();

        let (whole, split) = (whole.get(), split.get());
        prop_assert_eq!(whole.true_positive_rates, split.true_positive_rates);
        prop_assert_eq!(whole.false_positive_rates, split.false_positive_rates);

        // Recall is NaN on both sides when neither frame has a target
        for (a, b) in whole.target_recall.iter().zip(&split.target_recall) {
            prop_assert!(a == b || (a.is_nan() && b.is_nan()));
        }
    }

    #[test]
    fn prop_get_is_idempotent(scores in score_frames(1), masks in mask_frames(1)) {
        let mut metric = RocMetric::<TestBackend>::new(3).unwrap();
        metric.update(frames(&scores, 1), frames(&masks, 1)).unwrap();

        let first = metric.get();
        let second = metric.get();
        prop_assert_eq!(first.true_positive_rates, second.true_positive_rates);
        prop_assert_eq!(first.false_positive_rates, second.false_positive_rates);
    }
}
