//! Per-sample IoU (nIoU) accumulated over an evaluation run.
//!
//! Unlike [`SigmoidMetric`](super::SigmoidMetric), every sample keeps its own
//! intersection and union, so small targets weigh as much as large ones in the mean.

use std::marker::PhantomData;

use burn::{
    prelude::*,
    tensor::{activation::sigmoid, backend::Backend, Tensor},
};
use tracing::{debug, warn};

use crate::{
    error::{MetricError, MetricResult},
    metrics::{
        input::{ensure_same_shape, int_to_host},
        pixel::SPACING,
    },
};

/// Configuration for the [`SamplewiseSigmoidMetric`].
#[derive(Config, Debug)]
pub struct SamplewiseSigmoidMetricConfig {
    /// Number of classes. Only single-class detection is evaluated.
    #[config(default = 1)]
    pub nclass: usize,
    /// Sigmoid scores strictly above this value are foreground.
    #[config(default = 0.5)]
    pub score_thresh: f32,
}

impl SamplewiseSigmoidMetricConfig {
    pub fn init<B: Backend>(&self) -> SamplewiseSigmoidMetric<B> {
        SamplewiseSigmoidMetric {
            total_inter: Vec::new(),
            total_union: Vec::new(),
            nclass: self.nclass,
            score_thresh: self.score_thresh,
            _b: PhantomData,
        }
    }
}

/// Keeps the intersection and union of every sample seen, in update order.
#[derive(Debug, Clone)]
pub struct SamplewiseSigmoidMetric<B: Backend> {
    total_inter: Vec<u64>,
    total_union: Vec<u64>,
    nclass: usize,
    score_thresh: f32,
    _b: PhantomData<B>,
}

impl<B: Backend> Default for SamplewiseSigmoidMetric<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> SamplewiseSigmoidMetric<B> {
    pub fn new() -> Self {
        SamplewiseSigmoidMetricConfig::new().init()
    }

    pub const fn nclass(&self) -> usize {
        self.nclass
    }

    /// Number of samples seen since the last reset.
    pub fn len(&self) -> usize {
        self.total_inter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_inter.is_empty()
    }

    /// Add one batch of logits and labels; the first dimension indexes samples.
    pub fn update<const D: usize>(
        &mut self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> MetricResult<()> {
        let (inter, union) =
            batch_intersection_union_per_sample(predictions, targets, self.score_thresh)?;

        debug!(samples = inter.len(), "samplewise metric updated");
        self.total_inter.extend(inter);
        self.total_union.extend(union);
        Ok(())
    }

    /// Per-sample IoU in update order and its mean.
    ///
    /// The mean of an empty run is NaN.
    pub fn get(&self) -> (Vec<f64>, f64) {
        let iou: Vec<f64> = self
            .total_inter
            .iter()
            .zip(&self.total_union)
            .map(|(&inter, &union)| inter as f64 / (SPACING + union as f64))
            .collect();

        if iou.is_empty() {
            warn!("nIoU requested before any sample was added");
            return (iou, f64::NAN);
        }
        let mean = iou.iter().sum::<f64>() / iou.len() as f64;
        (iou, mean)
    }

    pub fn reset(&mut self) {
        self.total_inter.clear();
        self.total_union.clear();
    }
}

/// Count intersection and union for every sample of a batch.
///
/// The prediction is `sigmoid(logits) > score_thresh`; targets are truncated to integers
/// and only the value `1` counts as labeled.
pub fn batch_intersection_union_per_sample<B: Backend, const D: usize>(
    predictions: Tensor<B, D>,
    targets: Tensor<B, D>,
    score_thresh: f32,
) -> MetricResult<(Vec<u64>, Vec<u64>)> {
    ensure_same_shape(&predictions, &targets)?;

    let num_elements = predictions.shape().num_elements();
    if num_elements == 0 {
        return Ok((Vec::new(), Vec::new()));
    }
    let num_sample = predictions.dims()[0];
    let per_sample = num_elements / num_sample;

    let predict = sigmoid(predictions)
        .greater_elem(score_thresh)
        .int()
        .reshape([num_sample, per_sample]);
    let labeled = targets
        .int()
        .equal_elem(1)
        .int()
        .reshape([num_sample, per_sample]);

    let area_inter = int_to_host((predict.clone() * labeled.clone()).sum_dim(1))?;
    let area_pred = int_to_host(predict.sum_dim(1))?;
    let area_lab = int_to_host(labeled.sum_dim(1))?;

    let mut inter_arr = Vec::with_capacity(num_sample);
    let mut union_arr = Vec::with_capacity(num_sample);
    for ((&inter, &pred), &lab) in area_inter.iter().zip(&area_pred).zip(&area_lab) {
        let inter = inter.max(0) as u64;
        let union = (pred + lab).max(0) as u64 - inter;
        if inter > union {
            return Err(MetricError::CountInvariant {
                name: "area_inter",
                value: inter,
                bound_name: "area_union",
                bound: union,
            });
        }
        inter_arr.push(inter);
        union_arr.push(union);
    }
    Ok((inter_arr, union_arr))
}
