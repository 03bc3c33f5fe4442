//! Evaluation tools for infrared small target detection
//!
//! This crate runs the `irstd-metrics` accumulators over prediction images saved to
//! disk and reports the results.
//!
//! ## Usage
//!
//! ```bash
//! # Evaluate a directory of predictions against ground-truth masks
//! cargo run --bin evaluate -- preds/ masks/ --dataset NUDT-SIRST --output summary.json
//!
//! # Load settings from a JSON file, overriding the number of bins
//! cargo run --bin evaluate -- preds/ masks/ --config eval.json --bins 20
//! ```

pub mod common;
pub mod config;

pub use common::{
    create_device, get_backend_name, load_mask, pair_by_stem, setup_logging, ImagePair,
    SelectedBackend, SelectedDevice,
};
pub use config::EvaluationConfig;
