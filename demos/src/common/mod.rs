//! Shared functionality for the evaluation tools.

pub mod backend;
pub mod image;
pub mod logging;

pub use backend::{create_device, get_backend_name, SelectedBackend, SelectedDevice};
pub use self::image::{load_mask, pair_by_stem, ImagePair};
pub use logging::setup_logging;
