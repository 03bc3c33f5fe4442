//! Pixel accuracy and mIoU accumulated over an evaluation run.
//!
//! The prediction is binarized at a fixed threshold without any activation, so the
//! metric expects probability-space scores. Counts are summed over every update and
//! the ratios are taken over the sums, which makes the result independent of how the
//! samples were split into batches.

use std::marker::PhantomData;

use burn::{
    prelude::*,
    tensor::{backend::Backend, Tensor},
};
use tracing::debug;

use crate::{
    error::{MetricError, MetricResult},
    metrics::input::{count_both, count_true, ensure_same_shape},
};

/// Smallest increment of `1.0`, added to every denominator.
pub(crate) const SPACING: f64 = f64::EPSILON;

/// Configuration for the [`SigmoidMetric`].
#[derive(Config, Debug)]
pub struct SigmoidMetricConfig {
    /// Scores strictly above this value are foreground.
    #[config(default = 0.5)]
    pub threshold: f32,
}

impl SigmoidMetricConfig {
    pub fn init<B: Backend>(&self) -> SigmoidMetric<B> {
        SigmoidMetric {
            total: PixelCounts::default(),
            last: PixelCounts::default(),
            threshold: self.threshold,
            _b: PhantomData,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PixelCounts {
    correct: u64,
    labeled: u64,
    intersection: u64,
    union: u64,
}

impl PixelCounts {
    fn ratios(&self) -> (f64, f64) {
        let pix_acc = self.correct as f64 / (SPACING + self.labeled as f64);
        let miou = self.intersection as f64 / (SPACING + self.union as f64);
        (pix_acc, miou)
    }
}

/// Accumulates pixel accuracy and IoU over every update.
#[derive(Debug, Clone)]
pub struct SigmoidMetric<B: Backend> {
    total: PixelCounts,
    last: PixelCounts,
    threshold: f32,
    _b: PhantomData<B>,
}

impl<B: Backend> Default for SigmoidMetric<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> SigmoidMetric<B> {
    pub fn new() -> Self {
        SigmoidMetricConfig::new().init()
    }

    /// Add one batch of predictions and labels.
    ///
    /// # Errors
    /// Fails without touching the running totals if the shapes differ or a count
    /// exceeds its bound.
    pub fn update<const D: usize>(
        &mut self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> MetricResult<()> {
        let (correct, labeled) =
            batch_pix_accuracy(predictions.clone(), targets.clone(), self.threshold)?;
        let (intersection, union) = batch_intersection_union(predictions, targets, self.threshold)?;

        self.last = PixelCounts {
            correct,
            labeled,
            intersection,
            union,
        };
        self.total.correct += correct;
        self.total.labeled += labeled;
        self.total.intersection += intersection;
        self.total.union += union;

        debug!(
            correct,
            labeled, intersection, union, "pixel metric updated"
        );
        Ok(())
    }

    /// `(pixel_accuracy, mIoU)` of the most recent update only.
    pub fn now(&self) -> (f64, f64) {
        self.last.ratios()
    }

    /// `(pixel_accuracy, mIoU)` over every update since the last reset.
    pub fn get(&self) -> (f64, f64) {
        self.total.ratios()
    }

    pub fn reset(&mut self) {
        self.total = PixelCounts::default();
        self.last = PixelCounts::default();
    }
}

/// Count `(correct, labeled)` pixels of one batch.
///
/// `labeled` is the number of target pixels above zero and `correct` the number of
/// those whose binarized prediction equals the target value. Background pixels never
/// count as correct.
pub fn batch_pix_accuracy<B: Backend, const D: usize>(
    predictions: Tensor<B, D>,
    targets: Tensor<B, D>,
    threshold: f32,
) -> MetricResult<(u64, u64)> {
    ensure_same_shape(&predictions, &targets)?;

    let predict = predictions.greater_elem(threshold).float();
    let labeled_mask = targets.clone().greater_elem(0.0);
    let pixel_labeled = count_true(labeled_mask.clone());
    let pixel_correct = count_both(predict.equal(targets), labeled_mask);

    if pixel_correct > pixel_labeled {
        return Err(MetricError::CountInvariant {
            name: "pixel_correct",
            value: pixel_correct,
            bound_name: "pixel_labeled",
            bound: pixel_labeled,
        });
    }
    Ok((pixel_correct, pixel_labeled))
}

/// Count `(intersection, union)` pixels of one batch.
///
/// Targets are truncated to integers and only the value `1` counts as labeled, so the
/// union of a `{0, 1}` mask is the usual foreground union.
pub fn batch_intersection_union<B: Backend, const D: usize>(
    predictions: Tensor<B, D>,
    targets: Tensor<B, D>,
    threshold: f32,
) -> MetricResult<(u64, u64)> {
    ensure_same_shape(&predictions, &targets)?;

    let predict = predictions.greater_elem(threshold);
    let labeled = targets.int().equal_elem(1);

    let area_inter = count_both(predict.clone(), labeled.clone());
    let area_pred = count_true(predict);
    let area_lab = count_true(labeled);
    let area_union = area_pred + area_lab - area_inter;

    if area_inter > area_union {
        return Err(MetricError::CountInvariant {
            name: "area_inter",
            value: area_inter,
            bound_name: "area_union",
            bound: area_union,
        });
    }
    Ok((area_inter, area_union))
}
