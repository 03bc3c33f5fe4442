//! Single-shot F1 between one prediction and its mask.

use burn::tensor::{backend::Backend, Tensor};
use serde::Serialize;
use tracing::debug;

use crate::{
    error::MetricResult,
    metrics::input::{count_both, count_true, ensure_same_shape},
};

/// Binarization threshold used when none is given.
pub const F1_DEFAULT_THRESHOLD: f32 = 0.0;

/// Recall, precision and their harmonic mean for a single prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct F1Measure {
    pub recall: f64,
    pub precision: f64,
    pub f1: f64,
}

/// Compare one prediction against its mask, both binarized with `> threshold`.
///
/// Empty masks and empty predictions count as one pixel, so the ratios stay finite.
pub fn calculate_f1_measure<B: Backend, const D: usize>(
    output: Tensor<B, D>,
    gt: Tensor<B, D>,
    threshold: f32,
) -> MetricResult<F1Measure> {
    ensure_same_shape(&output, &gt)?;

    let out_bin = output.greater_elem(threshold);
    let gt_bin = gt.greater_elem(threshold);

    let hits = count_both(gt_bin.clone(), out_bin.clone()) as f64;
    let recall = hits / count_true(gt_bin).max(1) as f64;
    let precision = hits / count_true(out_bin).max(1) as f64;
    let f1 = 2.0 * recall * precision / (recall + precision).max(0.001);

    debug!(recall, precision, f1, "F1 measure");
    Ok(F1Measure {
        recall,
        precision,
        f1,
    })
}
