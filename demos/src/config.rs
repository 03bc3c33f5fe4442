//! Configuration for the evaluation tools.

use std::path::PathBuf;

use irstd_metrics::{EvaluationSuiteConfig, PdFaOutputMetricConfig, ScoreKind};
use serde::{Deserialize, Serialize};

/// Configuration for the `evaluate` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Number of threshold steps of the ROC and PD/FA curves.
    pub bins: usize,
    /// Threshold of the pixel metric, in probability space.
    pub pixel_threshold: f32,
    /// Threshold of the per-sample metric, applied after the sigmoid.
    pub score_threshold: f32,
    /// Centroid distance under which a prediction detects a target.
    pub match_distance: f64,
    /// What the prediction images hold.
    pub scores: ScoreKind,
    /// Dataset name used in the missed-image log file name.
    pub dataset: String,
    /// Directory of the missed-image log.
    pub missed_log_dir: PathBuf,
    /// Where to write the JSON summary. Printed only when unset.
    pub output: Option<PathBuf>,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            bins: 10,
            pixel_threshold: 0.5,
            score_threshold: 0.5,
            match_distance: 3.0,
            scores: ScoreKind::Probabilities,
            dataset: "test".to_string(),
            missed_log_dir: PathBuf::from("MD_list"),
            output: None,
            log_level: "info".to_string(),
        }
    }
}

impl EvaluationConfig {
    pub fn suite(&self) -> EvaluationSuiteConfig {
        EvaluationSuiteConfig::new()
            .with_bins(self.bins)
            .with_pixel_threshold(self.pixel_threshold)
            .with_score_threshold(self.score_threshold)
            .with_match_distance(self.match_distance)
            .with_scores(self.scores.clone())
    }

    pub fn missed_log(&self) -> PdFaOutputMetricConfig {
        PdFaOutputMetricConfig::new()
            .with_bins(self.bins)
            .with_match_distance(self.match_distance)
            .with_missed_log_dir(self.missed_log_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parses_partial_override() {
        let mut value = serde_json::to_value(EvaluationConfig::default()).unwrap();
        value["bins"] = serde_json::json!(25);
        value["dataset"] = serde_json::json!("SIRST");

        let config: EvaluationConfig = serde_json::from_value(value).unwrap();
        assert_eq!(config.bins, 25);
        assert_eq!(config.suite().bins, 25);
        assert_eq!(config.missed_log().bins, 25);
        assert_eq!(config.dataset, "SIRST");
    }
}
