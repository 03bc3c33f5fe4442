//! Region-level probability of detection (PD) and false alarm (FA).
//!
//! Every frame is thresholded, split into 8-connected regions, and ground-truth regions
//! are paired with predicted regions by centroid distance. Pairing is greedy first-fit:
//! each target, in label order, takes the first still-unpaired prediction closer than
//! the match distance. The result depends on region order, and it can miss pairings an
//! optimal assignment would find.

use std::marker::PhantomData;

use burn::{
    prelude::*,
    tensor::{backend::Backend, Tensor},
};
use region_ops::{BinaryImage, BinaryImageOps, Region};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    error::{MetricError, MetricResult},
    metrics::{
        input::HostFrames,
        thresholds::{stepped_thresholds, validate_bins},
    },
};

/// Configuration for the [`PdFaMetric`].
#[derive(Config, Debug)]
pub struct PdFaMetricConfig {
    /// Number of classes. Only single-class detection is evaluated.
    #[config(default = 1)]
    pub nclass: usize,
    /// Number of threshold steps; the curve has `bins + 1` points.
    #[config(default = 10)]
    pub bins: usize,
    /// Centroids strictly closer than this many pixels are paired.
    #[config(default = 3.0)]
    pub match_distance: f64,
}

impl PdFaMetricConfig {
    pub fn validate(&self) -> MetricResult<()> {
        validate_bins(self.bins)?;
        validate_match_distance(self.match_distance)
    }

    pub fn init<B: Backend>(&self) -> MetricResult<PdFaMetric<B>> {
        self.validate()?;
        Ok(PdFaMetric {
            counts: vec![PdFaCounts::default(); self.bins + 1],
            thresholds: stepped_thresholds(self.bins),
            nclass: self.nclass,
            match_distance: self.match_distance,
            _b: PhantomData,
        })
    }
}

pub(crate) fn validate_match_distance(distance: f64) -> MetricResult<()> {
    if !distance.is_finite() || distance <= 0.0 {
        return Err(MetricError::InvalidConfiguration {
            reason: format!("Match distance must be a positive number, got {distance}"),
        });
    }
    Ok(())
}

/// Per-threshold result of [`PdFaMetric::get`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdFaCurve {
    pub thresholds: Vec<f32>,
    /// Unpaired predicted area over all pixels seen.
    pub false_alarm_rate: Vec<f64>,
    /// Paired targets over all targets. NaN or infinite when no target was seen.
    pub detection_probability: Vec<f64>,
    /// Predicted regions left without a target.
    pub false_alarm_targets: Vec<u64>,
}

/// Running sums of one threshold bin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PdFaCounts {
    pub false_alarm_area: u64,
    pub detected: u64,
    pub targets: u64,
    pub predicted: u64,
}

impl PdFaCounts {
    pub fn add(&mut self, other: &Self) {
        self.false_alarm_area += other.false_alarm_area;
        self.detected += other.detected;
        self.targets += other.targets;
        self.predicted += other.predicted;
    }

    pub fn add_match(&mut self, targets: usize, predicted: usize, matching: &RegionMatch) {
        self.false_alarm_area += matching.unmatched_area;
        self.detected += matching.matched as u64;
        self.targets += targets as u64;
        self.predicted += predicted as u64;
    }
}

/// Outcome of pairing the regions of one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RegionMatch {
    pub matched: usize,
    pub unmatched_area: u64,
    pub missed_targets: usize,
}

/// Greedy first-fit pairing of target regions with predicted regions.
pub(crate) fn match_regions(
    targets: &[Region],
    predictions: &[Region],
    max_distance: f64,
) -> RegionMatch {
    let mut unmatched: Vec<&Region> = predictions.iter().collect();
    let mut matched = 0;

    for target in targets {
        if let Some(index) = unmatched
            .iter()
            .position(|prediction| target.centroid_distance(prediction) < max_distance)
        {
            unmatched.remove(index);
            matched += 1;
        }
    }

    RegionMatch {
        matched,
        unmatched_area: unmatched.iter().map(|region| region.area as u64).sum(),
        missed_targets: targets.len() - matched,
    }
}

/// Pair the regions of one thresholded frame against its mask and add them to `counts`.
pub(crate) fn accumulate_frame(
    counts: &mut PdFaCounts,
    predict: &BinaryImage,
    gt: &[Region],
    max_distance: f64,
) -> RegionMatch {
    let predicted = predict.regions();
    let matching = match_regions(gt, &predicted, max_distance);
    counts.add_match(gt.len(), predicted.len(), &matching);
    matching
}

pub(crate) fn pd_fa_curve(
    thresholds: &[f32],
    counts: &[PdFaCounts],
    img_num: usize,
    w: usize,
    h: usize,
) -> PdFaCurve {
    let pixels = (w * h * img_num) as f64;
    if pixels == 0.0 {
        warn!(img_num, w, h, "false alarm rate over zero pixels");
    }
    if counts.iter().any(|c| c.targets == 0) {
        warn!("detection probability is not finite: no ground-truth target seen");
    }

    PdFaCurve {
        thresholds: thresholds.to_vec(),
        false_alarm_rate: counts
            .iter()
            .map(|c| c.false_alarm_area as f64 / pixels)
            .collect(),
        detection_probability: counts
            .iter()
            .map(|c| c.detected as f64 / c.targets as f64)
            .collect(),
        false_alarm_targets: counts.iter().map(|c| c.predicted - c.detected).collect(),
    }
}

/// PD/FA accumulated over an evaluation run.
///
/// Predictions are thresholded as given, without a sigmoid.
#[derive(Debug, Clone)]
pub struct PdFaMetric<B: Backend> {
    counts: Vec<PdFaCounts>,
    thresholds: Vec<f32>,
    nclass: usize,
    match_distance: f64,
    _b: PhantomData<B>,
}

impl<B: Backend> PdFaMetric<B> {
    pub fn new(bins: usize) -> MetricResult<Self> {
        PdFaMetricConfig::new().with_bins(bins).init()
    }

    pub fn bins(&self) -> usize {
        self.thresholds.len() - 1
    }

    pub const fn nclass(&self) -> usize {
        self.nclass
    }

    /// Add predictions and labels viewed as frames of `w` rows by `h` columns.
    pub fn update<const D: usize>(
        &mut self,
        predictions: Tensor<B, D>,
        labels: Tensor<B, D>,
        w: usize,
        h: usize,
    ) -> MetricResult<()> {
        let scores = HostFrames::from_tensor_with_plane(predictions, w, h)?;
        let masks = HostFrames::from_tensor_with_plane(labels, w, h)?;
        if scores.frames() != masks.frames() {
            return Err(MetricError::ShapeMismatch {
                prediction: format!("{} frames of {w}x{h}", scores.frames()),
                target: format!("{} frames of {w}x{h}", masks.frames()),
            });
        }

        let mut batch = vec![PdFaCounts::default(); self.counts.len()];
        for frame in 0..scores.frames() {
            let gt = masks.binarize(frame, |v| v > 0.0)?.regions();

            for (counts, &threshold) in batch.iter_mut().zip(&self.thresholds) {
                let predict = scores.binarize(frame, |s| s > threshold)?;
                accumulate_frame(counts, &predict, &gt, self.match_distance);
            }
        }

        for (total, counts) in self.counts.iter_mut().zip(&batch) {
            total.add(counts);
        }
        debug!(frames = scores.frames(), "PD/FA metric updated");
        Ok(())
    }

    /// Rates over `img_num` images of `w x h` pixels.
    pub fn get(&self, img_num: usize, w: usize, h: usize) -> PdFaCurve {
        pd_fa_curve(&self.thresholds, &self.counts, img_num, w, h)
    }

    pub fn reset(&mut self) {
        self.counts.fill(PdFaCounts::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    /// A 10x10 map that is `value` inside the 3x3 blocks starting at the given corners.
    fn blocks(corners: &[(usize, usize)], value: f32) -> Tensor<TestBackend, 4> {
        let mut data = vec![0.0; 100];
        for &(r0, c0) in corners {
            for r in r0..r0 + 3 {
                for c in c0..c0 + 3 {
                    data[r * 10 + c] = value;
                }
            }
        }
        Tensor::<TestBackend, 1>::from_floats(data.as_slice(), &Default::default())
            .reshape([1, 1, 10, 10])
    }

    fn region(centroid: (f64, f64), area: usize) -> Region {
        Region {
            label: 0,
            area,
            centroid,
        }
    }

    #[test]
    fn test_near_prediction_is_detected() {
        // Centroids (3, 3) and (3, 5)
        let mut metric = PdFaMetric::<TestBackend>::new(2).unwrap();
        metric
            .update(blocks(&[(2, 4)], 0.9), blocks(&[(2, 2)], 1.0), 10, 10)
            .unwrap();

        let curve = metric.get(1, 10, 10);
        assert_relative_eq!(curve.detection_probability[1], 1.0);
        assert_relative_eq!(curve.false_alarm_rate[1], 0.0);
        assert_eq!(curve.false_alarm_targets[1], 0);
    }

    #[test]
    fn test_far_prediction_is_false_alarm() {
        // Centroids (3, 3) and (3, 8)
        let mut metric = PdFaMetric::<TestBackend>::new(2).unwrap();
        metric
            .update(blocks(&[(2, 7)], 0.9), blocks(&[(2, 2)], 1.0), 10, 10)
            .unwrap();

        let curve = metric.get(1, 10, 10);
        assert_relative_eq!(curve.detection_probability[1], 0.0);
        assert_relative_eq!(curve.false_alarm_rate[1], 9.0 / 100.0);
        assert_eq!(curve.false_alarm_targets[1], 1);
    }

    #[test]
    fn test_threshold_is_applied_to_raw_scores() {
        let mut metric = PdFaMetric::<TestBackend>::new(2).unwrap();
        metric
            .update(blocks(&[(2, 2)], 0.4), blocks(&[(2, 2)], 1.0), 10, 10)
            .unwrap();

        let curve = metric.get(1, 10, 10);
        assert_relative_eq!(curve.thresholds[1], 0.5);
        assert_relative_eq!(curve.detection_probability[0], 1.0);
        assert_relative_eq!(curve.detection_probability[1], 0.0);
    }

    #[test]
    fn test_detection_probability_without_targets_is_nan() {
        let mut metric = PdFaMetric::<TestBackend>::new(1).unwrap();
        metric
            .update(blocks(&[], 0.0), blocks(&[], 0.0), 10, 10)
            .unwrap();

        let curve = metric.get(1, 10, 10);
        assert!(curve.detection_probability.iter().all(|p| p.is_nan()));
    }

    #[test]
    fn test_greedy_matching_is_first_fit() {
        let targets = [region((0.0, 0.0), 9), region((0.0, -2.5), 9)];
        // The first target takes the first prediction, which the second target also
        // needed; the second prediction is too far from the second target.
        let predictions = [region((0.0, -1.0), 4), region((0.0, 2.0), 5)];

        let matching = match_regions(&targets, &predictions, 3.0);
        assert_eq!(matching.matched, 1);
        assert_eq!(matching.missed_targets, 1);
        assert_eq!(matching.unmatched_area, 5);
    }

    #[test]
    fn test_match_distance_is_strict() {
        let targets = [region((0.0, 0.0), 1)];
        let predictions = [region((0.0, 3.0), 1)];

        assert_eq!(match_regions(&targets, &predictions, 3.0).matched, 0);
        assert_eq!(match_regions(&targets, &predictions, 3.5).matched, 1);
    }

    #[test]
    fn test_plane_must_divide_input() {
        let mut metric = PdFaMetric::<TestBackend>::new(1).unwrap();
        let result = metric.update(blocks(&[], 0.0), blocks(&[], 0.0), 3, 3);
        assert!(matches!(result, Err(MetricError::InvalidShape { .. })));
    }

    #[test]
    fn test_reset_clears_all_counts() {
        let mut metric = PdFaMetric::<TestBackend>::new(1).unwrap();
        metric
            .update(blocks(&[(2, 7)], 0.9), blocks(&[(2, 2)], 1.0), 10, 10)
            .unwrap();
        metric.reset();
        metric
            .update(blocks(&[(2, 2)], 0.9), blocks(&[(2, 2)], 1.0), 10, 10)
            .unwrap();

        let curve = metric.get(1, 10, 10);
        assert_relative_eq!(curve.detection_probability[0], 1.0);
        assert_eq!(curve.false_alarm_targets[0], 0);
    }

    #[test]
    fn test_invalid_match_distance_rejected() {
        let config = PdFaMetricConfig::new().with_match_distance(0.0);
        assert!(config.init::<TestBackend>().is_err());
    }
}
