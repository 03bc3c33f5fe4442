//! Evaluate saved predictions against ground-truth masks
//!
//! Pairs every mask with the prediction image of the same file stem and reports pixel
//! accuracy, mIoU, nIoU, the ROC curve and the PD/FA curve. Images whose targets are
//! missed at threshold zero are listed in `<missed-log-dir>/missed_img_on_<dataset>.txt`.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin evaluate -- preds/ masks/ --dataset NUDT-SIRST --output summary.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use irstd_demos::{
    common::{create_device, get_backend_name, load_mask, pair_by_stem, SelectedBackend},
    setup_logging, EvaluationConfig,
};
use irstd_metrics::ScoreKind;
use std::{fs, path::PathBuf, time::Instant};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory of prediction images
    predictions: PathBuf,

    /// Directory of ground-truth mask images
    masks: PathBuf,

    /// Number of threshold steps
    #[arg(long)]
    bins: Option<usize>,

    /// Dataset name used for the missed-image log
    #[arg(long)]
    dataset: Option<String>,

    /// Directory of the missed-image log
    #[arg(long)]
    missed_log_dir: Option<PathBuf>,

    /// Write the JSON summary to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Treat prediction values as logits instead of probabilities
    #[arg(long)]
    logits: bool,

    /// Default log filter when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = if let Some(config_path) = &args.config {
        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        serde_json::from_str::<EvaluationConfig>(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?
    } else {
        EvaluationConfig::default()
    };

    // Command line overrides
    if let Some(bins) = args.bins {
        config.bins = bins;
    }
    if let Some(dataset) = args.dataset {
        config.dataset = dataset;
    }
    if let Some(dir) = args.missed_log_dir {
        config.missed_log_dir = dir;
    }
    if args.output.is_some() {
        config.output = args.output;
    }
    if args.logits {
        config.scores = ScoreKind::Logits;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    setup_logging(&config.log_level)?;

    for dir in [&args.predictions, &args.masks] {
        if !dir.is_dir() {
            anyhow::bail!("Input directory does not exist: {}", dir.display());
        }
    }

    let pairs = pair_by_stem(&args.predictions, &args.masks)?;
    if pairs.is_empty() {
        anyhow::bail!(
            "No prediction matches a mask in {}",
            args.masks.display()
        );
    }

    let device = create_device();
    info!(backend = get_backend_name(), images = pairs.len(), "starting evaluation");

    let mut suite = config
        .suite()
        .init::<SelectedBackend>()
        .context("Invalid evaluation settings")?;
    let mut missed = config
        .missed_log()
        .init::<SelectedBackend>()
        .context("Invalid evaluation settings")?;
    let log_path = missed.reset(&config.dataset);

    let start = Instant::now();
    for pair in &pairs {
        let prediction = load_mask::<SelectedBackend, _>(&pair.prediction, &device)?;
        let mask = load_mask::<SelectedBackend, _>(&pair.mask, &device)?;

        let [_, _, height, width] = mask.dims();
        if prediction.dims() != mask.dims() {
            warn!(
                name = %pair.name,
                prediction = ?prediction.dims(),
                mask = ?mask.dims(),
                "size mismatch, skipping"
            );
            continue;
        }

        suite
            .update(prediction.clone(), mask.clone())
            .with_context(|| format!("Failed to evaluate {}", pair.name))?;
        missed
            .update(prediction, mask, height, width, &log_path, &pair.name)
            .with_context(|| format!("Failed to evaluate {}", pair.name))?;
    }

    let summary = suite.summary();
    info!(
        images = summary.images,
        miou = summary.miou,
        niou = summary.niou,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "evaluation finished"
    );
    if let Some(best) = &summary.best {
        info!(
            threshold = best.threshold,
            pd = best.detection_probability,
            fa = best.false_alarm_rate,
            "operating point"
        );
    }

    let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
    println!("{json}");
    if let Some(output) = &config.output {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
        fs::write(output, json)
            .with_context(|| format!("Failed to write summary to {}", output.display()))?;
        info!(path = %output.display(), "summary written");
    }

    Ok(())
}
