//! Detection metrics for infrared small target evaluation.
//!
//! Pixel-level metrics ([`SigmoidMetric`], [`SamplewiseSigmoidMetric`]) work on the
//! device. Region-level metrics ([`RocMetric`], [`TargetRocMetric`], [`PdFaMetric`],
//! [`PdFaOutputMetric`]) copy each batch to the host once and label its regions there.

pub mod f_measure;
pub mod input;
pub mod pd_fa;
pub mod pd_fa_output;
pub mod pixel;
pub mod roc;
pub mod samplewise;
pub mod suite;
pub mod thresholds;

pub use f_measure::*;
pub use input::HostFrames;
pub use pd_fa::{PdFaCurve, PdFaMetric, PdFaMetricConfig};
pub use pd_fa_output::*;
pub use pixel::*;
pub use roc::*;
pub use samplewise::*;
pub use suite::*;
pub use thresholds::*;
