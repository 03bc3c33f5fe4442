//! The metrics of a typical test loop behind one update/summary surface.
//!
//! The metrics do not agree on what a score is. The pixel and PD/FA metrics threshold
//! scores as given, while the samplewise and ROC metrics apply a sigmoid first. The
//! suite converts the input once so that every metric sees the space it expects, and
//! hands probabilities to the ROC metric directly.

use burn::{
    prelude::*,
    tensor::{activation::sigmoid, backend::Backend, Tensor},
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    error::{MetricError, MetricResult},
    metrics::{
        input::ensure_same_shape,
        pd_fa::{PdFaCurve, PdFaMetric, PdFaMetricConfig},
        pixel::{SigmoidMetric, SigmoidMetricConfig},
        roc::{RocCurve, RocMetric, RocMetricConfig},
        samplewise::{SamplewiseSigmoidMetric, SamplewiseSigmoidMetricConfig},
    },
};

/// Probabilities are clamped this far from 0 and 1 before taking the logit.
const LOGIT_CLAMP: f32 = 1e-6;

/// What the prediction values passed to [`EvaluationSuite::update`] represent.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum ScoreKind {
    /// Raw network outputs.
    Logits,
    /// Values in `[0, 1]`, e.g. a saved prediction image.
    Probabilities,
}

#[derive(Config, Debug)]
pub struct EvaluationSuiteConfig {
    #[config(default = 10)]
    pub bins: usize,
    /// Threshold of the pixel metric, in probability space.
    #[config(default = 0.5)]
    pub pixel_threshold: f32,
    /// Threshold of the samplewise metric, applied after the sigmoid.
    #[config(default = 0.5)]
    pub score_threshold: f32,
    #[config(default = 3.0)]
    pub match_distance: f64,
    #[config(default = "ScoreKind::Logits")]
    pub scores: ScoreKind,
}

impl EvaluationSuiteConfig {
    pub fn init<B: Backend>(&self) -> MetricResult<EvaluationSuite<B>> {
        Ok(EvaluationSuite {
            pixel: SigmoidMetricConfig::new()
                .with_threshold(self.pixel_threshold)
                .init(),
            samplewise: SamplewiseSigmoidMetricConfig::new()
                .with_score_thresh(self.score_threshold)
                .init(),
            roc: RocMetricConfig::new().with_bins(self.bins).init()?,
            pd_fa: PdFaMetricConfig::new()
                .with_bins(self.bins)
                .with_match_distance(self.match_distance)
                .init()?,
            scores: self.scores.clone(),
            images: 0,
            pixels: 0,
        })
    }
}

/// A single PD/FA operating point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OperatingPoint {
    pub threshold: f32,
    pub detection_probability: f64,
    pub false_alarm_rate: f64,
}

/// Everything the suite measured since the last reset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub images: usize,
    pub pixel_accuracy: f64,
    pub miou: f64,
    pub niou: f64,
    pub roc: RocCurve,
    pub pd_fa: PdFaCurve,
    /// PD/FA at the threshold closest to 0.5, if any image was seen.
    pub best: Option<OperatingPoint>,
}

#[derive(Debug, Clone)]
pub struct EvaluationSuite<B: Backend> {
    pixel: SigmoidMetric<B>,
    samplewise: SamplewiseSigmoidMetric<B>,
    roc: RocMetric<B>,
    pd_fa: PdFaMetric<B>,
    scores: ScoreKind,
    images: usize,
    pixels: usize,
}

impl<B: Backend> EvaluationSuite<B> {
    /// Add one batch `[.., H, W]` of predictions and the masks of the same shape.
    ///
    /// The shapes are checked before any metric is touched.
    pub fn update<const D: usize>(
        &mut self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> MetricResult<()> {
        ensure_same_shape(&predictions, &targets)?;
        let dims = predictions.dims();
        if dims.len() < 2 || dims.contains(&0) {
            return Err(MetricError::InvalidShape {
                expected: "a non-empty [.., H, W] batch".to_string(),
                actual: format!("{dims:?}"),
            });
        }
        let (height, width) = (dims[dims.len() - 2], dims[dims.len() - 1]);
        let frames = predictions.shape().num_elements() / (height * width);

        let probabilities = match self.scores {
            ScoreKind::Logits => {
                self.samplewise.update(predictions.clone(), targets.clone())?;
                self.roc.update(predictions.clone(), targets.clone())?;
                sigmoid(predictions)
            }
            ScoreKind::Probabilities => {
                self.samplewise
                    .update(logit(predictions.clone()), targets.clone())?;
                self.roc
                    .update_probabilities(predictions.clone(), targets.clone())?;
                predictions
            }
        };

        self.pixel.update(probabilities.clone(), targets.clone())?;
        self.pd_fa.update(probabilities, targets, height, width)?;

        self.images += frames;
        self.pixels += frames * height * width;
        debug!(frames, height, width, "evaluation suite updated");
        Ok(())
    }

    pub fn summary(&self) -> EvaluationSummary {
        let (pixel_accuracy, miou) = self.pixel.get();
        let (_, niou) = self.samplewise.get();
        // Images may differ in size, so FA is taken over the total pixel count.
        let pd_fa = self.pd_fa.get(1, self.pixels, 1);

        let best = (self.images > 0)
            .then(|| operating_point(&pd_fa, 0.5))
            .flatten();

        EvaluationSummary {
            images: self.images,
            pixel_accuracy,
            miou,
            niou,
            roc: self.roc.get(),
            pd_fa,
            best,
        }
    }

    pub fn reset(&mut self) {
        self.pixel.reset();
        self.samplewise.reset();
        self.roc.reset();
        self.pd_fa.reset();
        self.images = 0;
        self.pixels = 0;
        info!("evaluation suite reset");
    }

    pub const fn images(&self) -> usize {
        self.images
    }
}

/// The curve point whose threshold is closest to `target`; the first one on ties.
pub fn operating_point(curve: &PdFaCurve, target: f32) -> Option<OperatingPoint> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &threshold) in curve.thresholds.iter().enumerate() {
        let gap = (threshold - target).abs();
        if best.map_or(true, |(_, best_gap)| gap < best_gap) {
            best = Some((index, gap));
        }
    }

    best.map(|(index, _)| OperatingPoint {
        threshold: curve.thresholds[index],
        detection_probability: curve.detection_probability[index],
        false_alarm_rate: curve.false_alarm_rate[index],
    })
}

fn logit<B: Backend, const D: usize>(probabilities: Tensor<B, D>) -> Tensor<B, D> {
    let p = probabilities.clamp(LOGIT_CLAMP, 1.0 - LOGIT_CLAMP);
    p.clone().log() - p.neg().add_scalar(1.0).log()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    /// A `[1, 1, 8, 8]` map that is `value` inside the 3x3 block at `(r0, c0)`.
    fn block(r0: usize, c0: usize, value: f32, background: f32) -> Tensor<TestBackend, 4> {
        let mut data = vec![background; 64];
        for r in r0..r0 + 3 {
            for c in c0..c0 + 3 {
                data[r * 8 + c] = value;
            }
        }
        Tensor::<TestBackend, 1>::from_floats(data.as_slice(), &Default::default())
            .reshape([1, 1, 8, 8])
    }

    #[test]
    fn test_perfect_probabilities() {
        let mut suite = EvaluationSuiteConfig::new()
            .with_bins(4)
            .with_scores(ScoreKind::Probabilities)
            .init::<TestBackend>()
            .unwrap();

        suite
            .update(block(2, 2, 1.0, 0.0), block(2, 2, 1.0, 0.0))
            .unwrap();
        let summary = suite.summary();

        assert_eq!(summary.images, 1);
        assert_relative_eq!(summary.pixel_accuracy, 1.0, epsilon = 1e-9);
        assert_relative_eq!(summary.miou, 1.0, epsilon = 1e-9);
        assert_relative_eq!(summary.niou, 1.0, epsilon = 1e-9);

        let best = summary.best.unwrap();
        assert_relative_eq!(best.threshold, 0.5);
        assert_relative_eq!(best.detection_probability, 1.0);
        assert_relative_eq!(best.false_alarm_rate, 0.0);
    }

    #[test]
    fn test_logits_and_probabilities_agree() {
        let mut from_logits = EvaluationSuiteConfig::new()
            .init::<TestBackend>()
            .unwrap();
        let mut from_probabilities = EvaluationSuiteConfig::new()
            .with_scores(ScoreKind::Probabilities)
            .init::<TestBackend>()
            .unwrap();

        from_logits
            .update(block(1, 1, 6.0, -6.0), block(1, 2, 1.0, 0.0))
            .unwrap();
        from_probabilities
            .update(block(1, 1, 0.95, 0.05), block(1, 2, 1.0, 0.0))
            .unwrap();

        let (a, b) = (from_logits.summary(), from_probabilities.summary());
        assert_relative_eq!(a.miou, b.miou, epsilon = 1e-9);
        assert_relative_eq!(a.niou, b.niou, epsilon = 1e-9);
        assert_eq!(a.pd_fa.false_alarm_targets, b.pd_fa.false_alarm_targets);
    }

    #[test]
    fn test_eight_bit_probability_on_threshold() {
        let mut suite = EvaluationSuiteConfig::new()
            .with_scores(ScoreKind::Probabilities)
            .init::<TestBackend>()
            .unwrap();

        suite
            .update(block(2, 2, 153.0 / 255.0, 0.0), block(2, 2, 1.0, 0.0))
            .unwrap();
        let summary = suite.summary();

        // 0.6 > 0.6 is false for both curves
        assert_relative_eq!(summary.roc.thresholds[6], 0.6);
        assert_relative_eq!(summary.roc.true_positive_rates[6], 0.0);
        assert_relative_eq!(summary.pd_fa.detection_probability[6], 0.0);
        assert_relative_eq!(summary.roc.true_positive_rates[5], 9.0 / 9.001, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_suite_has_no_operating_point() {
        let suite = EvaluationSuiteConfig::new().init::<TestBackend>().unwrap();
        let summary = suite.summary();

        assert_eq!(summary.images, 0);
        assert!(summary.best.is_none());
        assert!(summary.niou.is_nan());
    }

    #[test]
    fn test_shape_mismatch_leaves_suite_untouched() {
        let mut suite = EvaluationSuiteConfig::new().init::<TestBackend>().unwrap();
        let device = Default::default();
        let preds = Tensor::<TestBackend, 4>::zeros([1, 1, 4, 4], &device);
        let targets = Tensor::<TestBackend, 4>::zeros([1, 1, 4, 5], &device);

        assert!(suite.update(preds, targets).is_err());
        assert_eq!(suite.images(), 0);
    }

    #[test]
    fn test_reset_clears_image_count() {
        let mut suite = EvaluationSuiteConfig::new().init::<TestBackend>().unwrap();
        suite
            .update(block(0, 0, 5.0, -5.0), block(0, 0, 1.0, 0.0))
            .unwrap();
        suite.reset();
        assert_eq!(suite.images(), 0);
        assert!(suite.summary().best.is_none());
    }

    #[test]
    fn test_operating_point_prefers_first_on_ties() {
        let curve = PdFaCurve {
            thresholds: vec![0.25, 0.75],
            false_alarm_rate: vec![0.1, 0.2],
            detection_probability: vec![0.9, 0.8],
            false_alarm_targets: vec![1, 2],
        };
        let point = operating_point(&curve, 0.5).unwrap();
        assert_relative_eq!(point.threshold, 0.25);
    }

    #[test]
    fn test_zero_bins_rejected() {
        assert!(EvaluationSuiteConfig::new()
            .with_bins(0)
            .init::<TestBackend>()
            .is_err());
    }
}
