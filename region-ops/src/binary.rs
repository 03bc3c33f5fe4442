//! Binary image storage backed by an 8-bit grayscale buffer.

use image::{GrayImage, Luma};
use thiserror::Error;

/// Foreground value stored in the underlying buffer.
const FOREGROUND: u8 = 1;

/// The error type for region operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegionError {
    /// The requested image plane does not fit the 32-bit image dimensions.
    #[error("Image plane {rows}x{cols} exceeds the supported dimensions")]
    DimensionOverflow {
        /// Requested number of rows.
        rows: usize,
        /// Requested number of columns.
        cols: usize,
    },

    /// The pixel buffer length does not match the requested plane.
    #[error("Pixel buffer of length {len} cannot be viewed as {rows}x{cols}")]
    BufferLength {
        /// Length of the supplied buffer.
        len: usize,
        /// Requested number of rows.
        rows: usize,
        /// Requested number of columns.
        cols: usize,
    },
}

/// A binary image addressed by `(row, col)`.
///
/// Rows map to the image height and columns to the image width, so the
/// plane `rows x cols` matches the row-major layout of a flattened score map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryImage(GrayImage);

impl BinaryImage {
    /// Build a binary image by evaluating `foreground(row, col)` for every pixel.
    pub fn from_fn<F>(rows: usize, cols: usize, mut foreground: F) -> Result<Self, RegionError>
    where
        F: FnMut(usize, usize) -> bool,
    {
        let (width, height) = plane_dims(rows, cols)?;
        let image = GrayImage::from_fn(width, height, |x, y| {
            Luma([u8::from(foreground(y as usize, x as usize)) * FOREGROUND])
        });
        Ok(Self(image))
    }

    /// View a row-major slice of values as a binary image, foreground where `predicate` holds.
    pub fn from_slice<T, F>(
        values: &[T],
        rows: usize,
        cols: usize,
        predicate: F,
    ) -> Result<Self, RegionError>
    where
        T: Copy,
        F: Fn(T) -> bool,
    {
        if values.len() != rows * cols {
            return Err(RegionError::BufferLength {
                len: values.len(),
                rows,
                cols,
            });
        }
        Self::from_fn(rows, cols, |row, col| predicate(values[row * cols + col]))
    }

    pub fn rows(&self) -> usize {
        self.0.height() as usize
    }

    pub fn cols(&self) -> usize {
        self.0.width() as usize
    }

    /// Foreground test for a single pixel. Out-of-range coordinates read as background.
    pub fn get(&self, row: usize, col: usize) -> bool {
        if row >= self.rows() || col >= self.cols() {
            return false;
        }
        self.0.get_pixel(col as u32, row as u32)[0] == FOREGROUND
    }

    /// Number of foreground pixels.
    pub fn count(&self) -> usize {
        self.0.as_raw().iter().filter(|&&v| v == FOREGROUND).count()
    }

    pub(crate) const fn as_gray(&self) -> &GrayImage {
        &self.0
    }
}

fn plane_dims(rows: usize, cols: usize) -> Result<(u32, u32), RegionError> {
    match (u32::try_from(cols), u32::try_from(rows)) {
        (Ok(width), Ok(height)) => Ok((width, height)),
        _ => Err(RegionError::DimensionOverflow { rows, cols }),
    }
}
