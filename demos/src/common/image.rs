//! Loading of prediction and mask images

use anyhow::{Context, Result};
use burn::tensor::{backend::Backend, Tensor, TensorData};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tracing::warn;
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// A prediction image and the mask it is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePair {
    /// File stem shared by both images.
    pub name: String,
    pub prediction: PathBuf,
    pub mask: PathBuf,
}

/// Load an image as a grayscale tensor of shape `[1, 1, height, width]` in `[0, 1]`.
pub fn load_mask<B: Backend, P: AsRef<Path>>(path: P, device: &B::Device) -> Result<Tensor<B, 4>> {
    let path = path.as_ref();
    let img = image::open(path)
        .with_context(|| format!("Failed to open image at {}", path.display()))?;

    let gray = img.to_luma32f();
    let (width, height) = gray.dimensions();
    let data = TensorData::new(gray.into_raw(), [1, 1, height as usize, width as usize])
        .convert::<B::FloatElem>();

    Ok(Tensor::from_data(data, device))
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(ToOwned::to_owned)
}

/// Pair every mask under `masks` with the prediction under `predictions` that has the
/// same file stem. Masks without a prediction are skipped with a warning.
pub fn pair_by_stem(predictions: &Path, masks: &Path) -> Result<Vec<ImagePair>> {
    let by_stem: HashMap<String, PathBuf> = image_files(predictions)?
        .into_iter()
        .filter_map(|path| stem(&path).map(|s| (s, path)))
        .collect();

    let mut pairs = Vec::new();
    for mask in image_files(masks)? {
        let Some(name) = stem(&mask) else {
            continue;
        };
        match by_stem.get(&name) {
            Some(prediction) => pairs.push(ImagePair {
                name,
                prediction: prediction.clone(),
                mask,
            }),
            None => warn!(mask = %mask.display(), "no prediction for mask, skipping"),
        }
    }
    Ok(pairs)
}
