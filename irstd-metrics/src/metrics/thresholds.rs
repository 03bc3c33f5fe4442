//! Threshold schedules shared by the threshold-swept metrics.
//!
//! A schedule with `bins` steps has `bins + 1` thresholds spread evenly over `[0, 1]`,
//! both ends included. Scores are stored as `f32`, so thresholds are compared in `f32`.

use crate::error::{MetricError, MetricResult};

/// Thresholds `i / bins` for `i in 0..=bins`, as used by the ROC metrics.
pub fn ratio_thresholds(bins: usize) -> Vec<f32> {
    (0..=bins).map(|i| (i as f64 / bins as f64) as f32).collect()
}

/// Thresholds `i * (1 / bins)` for `i in 0..=bins`, as used by the PD/FA metrics.
///
/// The step is rounded once and then multiplied, so some thresholds differ from
/// [`ratio_thresholds`] in the last bit.
pub fn stepped_thresholds(bins: usize) -> Vec<f32> {
    let step = 1.0 / bins as f64;
    (0..=bins).map(|i| (i as f64 * step) as f32).collect()
}

pub(crate) fn validate_bins(bins: usize) -> MetricResult<()> {
    if bins == 0 {
        return Err(MetricError::InvalidConfiguration {
            reason: "Number of threshold bins must be >= 1, got 0".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedules_cover_unit_interval() {
        for bins in [1, 3, 10, 255] {
            let ratio = ratio_thresholds(bins);
            let stepped = stepped_thresholds(bins);

            assert_eq!(ratio.len(), bins + 1);
            assert_eq!(stepped.len(), bins + 1);
            assert_eq!(ratio[0], 0.0);
            assert_eq!(ratio[bins], 1.0);
            assert_eq!(stepped[0], 0.0);
        }
    }

    #[test]
    fn test_single_bin_schedule() {
        assert_eq!(ratio_thresholds(1), vec![0.0, 1.0]);
        assert_eq!(stepped_thresholds(1), vec![0.0, 1.0]);
    }

    #[test]
    fn test_zero_bins_rejected() {
        assert!(matches!(
            validate_bins(0),
            Err(MetricError::InvalidConfiguration { .. })
        ));
        assert!(validate_bins(1).is_ok());
    }
}
