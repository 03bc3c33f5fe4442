//! ROC curves swept over a fixed threshold schedule.
//!
//! [`RocMetric`] accumulates the pixel confusion matrix and a target-level recall for
//! every threshold `i / bins`. A ground-truth target counts as recalled when any
//! predicted pixel falls in the 2x2 window that ends just before its rounded centroid.
//!
//! [`TargetRocMetric`] is the reduced variant that keeps one hit flag per frame.

use std::marker::PhantomData;

use burn::{
    prelude::*,
    tensor::{activation::sigmoid, backend::Backend, Tensor},
};
use region_ops::{BinaryImage, BinaryImageOps, Region};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    error::MetricResult,
    metrics::{
        input::{ensure_same_shape, HostFrames},
        thresholds::{ratio_thresholds, validate_bins},
    },
};

/// Added to the positive and negative pixel counts before dividing.
pub const ROC_EPSILON: f64 = 0.001;

/// Configuration shared by [`RocMetric`] and [`TargetRocMetric`].
#[derive(Config, Debug)]
pub struct RocMetricConfig {
    /// Number of classes. Only single-class detection is evaluated.
    #[config(default = 1)]
    pub nclass: usize,
    /// Number of threshold steps; the curve has `bins + 1` points.
    #[config(default = 10)]
    pub bins: usize,
}

impl RocMetricConfig {
    pub fn validate(&self) -> MetricResult<()> {
        validate_bins(self.bins)
    }

    pub fn init<B: Backend>(&self) -> MetricResult<RocMetric<B>> {
        self.validate()?;
        Ok(RocMetric {
            counts: vec![RocCounts::default(); self.bins + 1],
            thresholds: ratio_thresholds(self.bins),
            nclass: self.nclass,
            _b: PhantomData,
        })
    }

    pub fn init_target<B: Backend>(&self) -> MetricResult<TargetRocMetric<B>> {
        self.validate()?;
        Ok(TargetRocMetric {
            counts: vec![TargetRocCounts::default(); self.bins + 1],
            thresholds: ratio_thresholds(self.bins),
            nclass: self.nclass,
            _b: PhantomData,
        })
    }
}

/// Per-threshold result of [`RocMetric::get`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocCurve {
    pub thresholds: Vec<f32>,
    /// `TP / (P + 0.001)` per threshold.
    pub true_positive_rates: Vec<f64>,
    /// `FP / (N + 0.001)` per threshold.
    pub false_positive_rates: Vec<f64>,
    /// Recalled targets over all targets, NaN when no target was seen.
    pub target_recall: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RocCounts {
    tp: u64,
    pos: u64,
    fp: u64,
    neg: u64,
    recalled: u64,
    targets: u64,
}

impl RocCounts {
    fn add(&mut self, other: &Self) {
        self.tp += other.tp;
        self.pos += other.pos;
        self.fp += other.fp;
        self.neg += other.neg;
        self.recalled += other.recalled;
        self.targets += other.targets;
    }
}

/// Pixel and target ROC accumulated over an evaluation run.
#[derive(Debug, Clone)]
pub struct RocMetric<B: Backend> {
    counts: Vec<RocCounts>,
    thresholds: Vec<f32>,
    nclass: usize,
    _b: PhantomData<B>,
}

impl<B: Backend> RocMetric<B> {
    pub fn new(bins: usize) -> MetricResult<Self> {
        RocMetricConfig::new().with_bins(bins).init()
    }

    pub fn bins(&self) -> usize {
        self.thresholds.len() - 1
    }

    pub const fn nclass(&self) -> usize {
        self.nclass
    }

    /// Add one batch of logits `[.., H, W]` and labels of the same shape.
    pub fn update<const D: usize>(
        &mut self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> MetricResult<()> {
        ensure_same_shape(&predictions, &targets)?;
        self.update_probabilities(sigmoid(predictions), targets)
    }

    /// Same as [`update`](Self::update) for scores already in `[0, 1]`.
    ///
    /// The scores are compared against the thresholds as given.
    pub fn update_probabilities<const D: usize>(
        &mut self,
        probabilities: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> MetricResult<()> {
        ensure_same_shape(&probabilities, &targets)?;
        let scores = HostFrames::from_tensor(probabilities)?;
        let labels = HostFrames::from_tensor(targets)?;

        let mut batch = vec![RocCounts::default(); self.counts.len()];
        for frame in 0..scores.frames() {
            let gt = labels.binarize(frame, |v| v > 0.0)?;
            let regions = gt.regions();

            for (counts, &threshold) in batch.iter_mut().zip(&self.thresholds) {
                let predict = scores.binarize(frame, |s| s > threshold)?;
                counts.add(&cal_tp_pos_fp_neg_target(&predict, &gt, &regions));
            }
        }

        for (total, counts) in self.counts.iter_mut().zip(&batch) {
            total.add(counts);
        }
        debug!(frames = scores.frames(), "ROC metric updated");
        Ok(())
    }

    pub fn get(&self) -> RocCurve {
        let mut curve = RocCurve {
            thresholds: self.thresholds.clone(),
            true_positive_rates: Vec::with_capacity(self.counts.len()),
            false_positive_rates: Vec::with_capacity(self.counts.len()),
            target_recall: Vec::with_capacity(self.counts.len()),
        };
        for counts in &self.counts {
            curve
                .true_positive_rates
                .push(counts.tp as f64 / (counts.pos as f64 + ROC_EPSILON));
            curve
                .false_positive_rates
                .push(counts.fp as f64 / (counts.neg as f64 + ROC_EPSILON));
            curve
                .target_recall
                .push(counts.recalled as f64 / counts.targets as f64);
        }

        if self.counts.iter().any(|c| c.targets == 0) {
            warn!("ROC target recall is NaN: no ground-truth target seen");
        }
        curve
    }

    pub fn reset(&mut self) {
        self.counts.fill(RocCounts::default());
    }
}

/// Per-threshold result of [`TargetRocMetric::get`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetRocCurve {
    pub thresholds: Vec<f32>,
    /// Summed per-frame hit flags.
    pub true_positives: Vec<u64>,
    /// `FP / (N + 0.001)` per threshold.
    pub false_positive_rates: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TargetRocCounts {
    tp: u64,
    fp: u64,
    neg: u64,
}

/// Frame-level hit count and pixel false-positive rate over an evaluation run.
///
/// The hit flag of a frame is decided by its *last* target only: every target
/// overwrites the flag left by the previous one. The window is also taken with the
/// row and column of the centroid swapped.
#[derive(Debug, Clone)]
pub struct TargetRocMetric<B: Backend> {
    counts: Vec<TargetRocCounts>,
    thresholds: Vec<f32>,
    nclass: usize,
    _b: PhantomData<B>,
}

impl<B: Backend> TargetRocMetric<B> {
    pub fn new(bins: usize) -> MetricResult<Self> {
        RocMetricConfig::new().with_bins(bins).init_target()
    }

    pub fn bins(&self) -> usize {
        self.thresholds.len() - 1
    }

    pub const fn nclass(&self) -> usize {
        self.nclass
    }

    pub fn update<const D: usize>(
        &mut self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> MetricResult<()> {
        ensure_same_shape(&predictions, &targets)?;
        self.update_probabilities(sigmoid(predictions), targets)
    }

    pub fn update_probabilities<const D: usize>(
        &mut self,
        probabilities: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> MetricResult<()> {
        ensure_same_shape(&probabilities, &targets)?;
        let scores = HostFrames::from_tensor(probabilities)?;
        let labels = HostFrames::from_tensor(targets)?;

        let mut batch = vec![TargetRocCounts::default(); self.counts.len()];
        for frame in 0..scores.frames() {
            let gt = labels.binarize(frame, |v| v > 0.0)?;
            let regions = gt.regions();

            for (counts, &threshold) in batch.iter_mut().zip(&self.thresholds) {
                let predict = scores.binarize(frame, |s| s > threshold)?;
                let (tp, fp, neg) = cal_tp_fp_neg(&predict, &gt, &regions);
                counts.tp += tp;
                counts.fp += fp;
                counts.neg += neg;
            }
        }

        for (total, counts) in self.counts.iter_mut().zip(&batch) {
            total.tp += counts.tp;
            total.fp += counts.fp;
            total.neg += counts.neg;
        }
        debug!(frames = scores.frames(), "target ROC metric updated");
        Ok(())
    }

    pub fn get(&self) -> TargetRocCurve {
        TargetRocCurve {
            thresholds: self.thresholds.clone(),
            true_positives: self.counts.iter().map(|c| c.tp).collect(),
            false_positive_rates: self
                .counts
                .iter()
                .map(|c| c.fp as f64 / (c.neg as f64 + ROC_EPSILON))
                .collect(),
        }
    }

    pub fn reset(&mut self) {
        self.counts.fill(TargetRocCounts::default());
    }
}

/// Rounded centroid as `(row, col)`, ties to even.
fn rounded_centroid(region: &Region) -> (i64, i64) {
    (
        region.centroid.0.round_ties_even() as i64,
        region.centroid.1.round_ties_even() as i64,
    )
}

fn pixel_confusion(predict: &BinaryImage, gt: &BinaryImage) -> (u64, u64, u64, u64) {
    let (mut tp, mut fp, mut tn, mut fn_) = (0, 0, 0, 0);
    for row in 0..gt.rows() {
        for col in 0..gt.cols() {
            match (predict.get(row, col), gt.get(row, col)) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, false) => tn += 1,
                (false, true) => fn_ += 1,
            }
        }
    }
    (tp, fp, tn, fn_)
}

fn cal_tp_pos_fp_neg_target(
    predict: &BinaryImage,
    gt: &BinaryImage,
    regions: &[Region],
) -> RocCounts {
    let (tp, fp, tn, fn_) = pixel_confusion(predict, gt);

    let recalled = regions
        .iter()
        .filter(|region| {
            let (c, r) = rounded_centroid(region);
            predict.any_in_window(c - 2, c, r - 2, r)
        })
        .count() as u64;

    RocCounts {
        tp,
        pos: tp + fn_,
        fp,
        neg: fp + tn,
        recalled,
        targets: regions.len() as u64,
    }
}

fn cal_tp_fp_neg(predict: &BinaryImage, gt: &BinaryImage, regions: &[Region]) -> (u64, u64, u64) {
    let (_, fp, tn, _) = pixel_confusion(predict, gt);

    let mut tp = 0;
    for region in regions {
        let (c, r) = rounded_centroid(region);
        tp = u64::from(predict.any_in_window(r - 2, r, c - 2, c));
    }
    (tp, fp, fp + tn)
}
