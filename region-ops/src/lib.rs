//! Connected-region extraction for binary detection masks
//!
//! This crate provides the geometric pieces the detection metrics need but that are not part
//! of the metric arithmetic itself: 8-connected labeling of a binary image, per-region
//! properties (area and centroid), and clamped window slicing over the image plane.

mod binary;
mod labeling;
mod window;

pub use binary::{BinaryImage, RegionError};
pub use labeling::{label_regions, Region};
pub use window::slice_range;

/// Convenience operations on binary images
pub trait BinaryImageOps {
    /// Extract the 8-connected foreground regions in label order.
    fn regions(&self) -> Vec<Region>;

    /// Whether any foreground pixel falls inside the window
    /// `rows[row_start..row_stop]`, `cols[col_start..col_stop]`, resolved by [`slice_range`].
    fn any_in_window(&self, row_start: i64, row_stop: i64, col_start: i64, col_stop: i64) -> bool;
}

impl BinaryImageOps for BinaryImage {
    fn regions(&self) -> Vec<Region> {
        label_regions(self)
    }

    fn any_in_window(&self, row_start: i64, row_stop: i64, col_start: i64, col_stop: i64) -> bool {
        let rows = slice_range(row_start, row_stop, self.rows());
        let cols = slice_range(col_start, col_stop, self.cols());
        rows.into_iter()
            .any(|row| cols.clone().any(|col| self.get(row, col)))
    }
}
