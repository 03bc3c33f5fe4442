//! PD/FA with a log of images whose targets were missed.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use burn::{
    prelude::*,
    tensor::{backend::Backend, Tensor},
};
use region_ops::BinaryImageOps;
use tracing::{debug, info};

use crate::{
    error::{MetricError, MetricResult},
    metrics::{
        input::HostFrames,
        pd_fa::{accumulate_frame, pd_fa_curve, validate_match_distance, PdFaCounts, PdFaCurve},
        thresholds::validate_bins,
    },
};

/// Configuration for the [`PdFaOutputMetric`].
#[derive(Config, Debug)]
pub struct PdFaOutputMetricConfig {
    /// Number of classes. Only single-class detection is evaluated.
    #[config(default = 1)]
    pub nclass: usize,
    /// Number of bins; every one of the `bins + 1` entries uses threshold `0`.
    #[config(default = 10)]
    pub bins: usize,
    /// Targets match a prediction whose centroid is strictly closer than this.
    #[config(default = 3.0)]
    pub match_distance: f64,
    /// Directory that holds the per-dataset missed-image lists.
    #[config(default = "PathBuf::from(\"MD_list\")")]
    pub missed_log_dir: PathBuf,
}

impl PdFaOutputMetricConfig {
    pub fn validate(&self) -> MetricResult<()> {
        validate_bins(self.bins)?;
        validate_match_distance(self.match_distance)
    }

    pub fn init<B: Backend>(&self) -> MetricResult<PdFaOutputMetric<B>> {
        self.validate()?;
        Ok(PdFaOutputMetric {
            counts: vec![PdFaCounts::default(); self.bins + 1],
            thresholds: vec![0.0; self.bins + 1],
            nclass: self.nclass,
            match_distance: self.match_distance,
            missed_log_dir: self.missed_log_dir.clone(),
            _b: PhantomData,
        })
    }
}

/// PD/FA at threshold zero that also records every image with an undetected target.
///
/// Every bin uses threshold `0` whatever its index, so all bins hold the same counts.
/// An image is logged once per [`update`](Self::update), as one line holding its name.
#[derive(Debug, Clone)]
pub struct PdFaOutputMetric<B: Backend> {
    counts: Vec<PdFaCounts>,
    thresholds: Vec<f32>,
    nclass: usize,
    match_distance: f64,
    missed_log_dir: PathBuf,
    _b: PhantomData<B>,
}

impl<B: Backend> PdFaOutputMetric<B> {
    pub fn new(bins: usize) -> MetricResult<Self> {
        PdFaOutputMetricConfig::new().with_bins(bins).init()
    }

    pub fn bins(&self) -> usize {
        self.thresholds.len() - 1
    }

    pub const fn nclass(&self) -> usize {
        self.nclass
    }

    /// Add predictions and labels viewed as frames of `w` rows by `h` columns.
    ///
    /// When any target of the input stays unpaired, `name` is appended to `log_path`.
    /// If that write fails the running counts are left untouched.
    pub fn update<const D: usize>(
        &mut self,
        predictions: Tensor<B, D>,
        labels: Tensor<B, D>,
        w: usize,
        h: usize,
        log_path: &Path,
        name: &str,
    ) -> MetricResult<()> {
        let scores = HostFrames::from_tensor_with_plane(predictions, w, h)?;
        let masks = HostFrames::from_tensor_with_plane(labels, w, h)?;
        if scores.frames() != masks.frames() {
            return Err(MetricError::ShapeMismatch {
                prediction: format!("{} frames of {w}x{h}", scores.frames()),
                target: format!("{} frames of {w}x{h}", masks.frames()),
            });
        }

        let mut frame_counts = PdFaCounts::default();
        let mut missed = false;
        for frame in 0..scores.frames() {
            let gt = masks.binarize(frame, |v| v > 0.0)?.regions();
            let predict = scores.binarize(frame, |s| s > 0.0)?;
            let matching = accumulate_frame(&mut frame_counts, &predict, &gt, self.match_distance);
            missed |= matching.missed_targets > 0;
        }

        if missed {
            append_line(log_path, name)?;
            debug!(name, path = %log_path.display(), "missed target logged");
        }

        for total in &mut self.counts {
            total.add(&frame_counts);
        }
        Ok(())
    }

    pub fn get(&self, img_num: usize, w: usize, h: usize) -> PdFaCurve {
        pd_fa_curve(&self.thresholds, &self.counts, img_num, w, h)
    }

    /// Clear the counts and return the missed-image log path for `dataset`.
    pub fn reset(&mut self, dataset: &str) -> PathBuf {
        self.counts.fill(PdFaCounts::default());
        let path = self
            .missed_log_dir
            .join(format!("missed_img_on_{dataset}.txt"));
        info!(path = %path.display(), "missed-image log");
        path
    }
}

fn append_line(path: &Path, line: &str) -> MetricResult<()> {
    let wrap = |source| MetricError::MissedLog {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(wrap)?;
    writeln!(file, "{line}").map_err(wrap)
}
