//! Threshold-swept detection metrics for infrared small target detection.
//!
//! Every metric is an accumulator built from a Burn `Config`: call `update` once per
//! batch, read the result with `get` as often as needed, and `reset` to start a new
//! evaluation run. Calls that fail return a [`MetricError`] and leave the accumulator
//! unchanged.

mod error;
pub mod metrics;

pub use error::{MetricError, MetricResult};
pub use metrics::{
    calculate_f1_measure, EvaluationSuite, EvaluationSuiteConfig, EvaluationSummary, F1Measure,
    OperatingPoint, PdFaCurve, PdFaMetric, PdFaMetricConfig, PdFaOutputMetric,
    PdFaOutputMetricConfig, RocCurve, RocMetric, RocMetricConfig, SamplewiseSigmoidMetric,
    SamplewiseSigmoidMetricConfig, ScoreKind, SigmoidMetric, SigmoidMetricConfig,
    TargetRocCurve, TargetRocMetric, F1_DEFAULT_THRESHOLD,
};
pub use region_ops::Region;
