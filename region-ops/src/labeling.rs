//! # Connected-region labeling
//!
//! Foreground pixels are grouped into 8-connected regions (diagonal neighbours
//! count as adjacent). Labels are assigned in raster order of each region's first
//! pixel, starting at 1, so the returned regions come out in the same order a scan
//! from the top-left corner would discover them.

use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::binary::BinaryImage;

/// Properties of a single connected region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// 1-based label in raster discovery order.
    pub label: u32,
    /// Number of pixels in the region.
    pub area: usize,
    /// Mean `(row, col)` of the region's pixels.
    pub centroid: (f64, f64),
}

impl Region {
    /// Euclidean distance between the centroids of two regions.
    pub fn centroid_distance(&self, other: &Self) -> f64 {
        let d_row = self.centroid.0 - other.centroid.0;
        let d_col = self.centroid.1 - other.centroid.1;
        d_row.hypot(d_col)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    area: usize,
    row_sum: f64,
    col_sum: f64,
}

/// Label the 8-connected foreground regions of `image` and compute their properties.
///
/// # Returns
/// One [`Region`] per label, ordered by label.
pub fn label_regions(image: &BinaryImage) -> Vec<Region> {
    let labels = connected_components(image.as_gray(), Connectivity::Eight, Luma([0u8]));

    let mut moments: Vec<Moments> = Vec::new();
    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel[0] as usize;
        if label == 0 {
            continue;
        }
        if moments.len() < label {
            moments.resize(label, Moments::default());
        }
        let entry = &mut moments[label - 1];
        entry.area += 1;
        entry.row_sum += f64::from(y);
        entry.col_sum += f64::from(x);
    }

    moments
        .into_iter()
        .enumerate()
        .filter(|(_, m)| m.area > 0)
        .map(|(index, m)| {
            let area = m.area as f64;
            Region {
                label: index as u32 + 1,
                area: m.area,
                centroid: (m.row_sum / area, m.col_sum / area),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn image_from_rows(rows: &[&str]) -> BinaryImage {
        let cols = rows[0].len();
        BinaryImage::from_fn(rows.len(), cols, |row, col| {
            rows[row].as_bytes()[col] == b'#'
        })
        .unwrap()
    }

    #[test]
    fn test_empty_image_has_no_regions() {
        let image = BinaryImage::from_fn(4, 4, |_, _| false).unwrap();
        assert!(label_regions(&image).is_empty());
    }

    #[test]
    fn test_diagonal_pixels_join_one_region() {
        let image = image_from_rows(&["#..", ".#.", "..#"]);
        let regions = label_regions(&image);

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 3);
        assert_relative_eq!(regions[0].centroid.0, 1.0);
        assert_relative_eq!(regions[0].centroid.1, 1.0);
    }

    #[test]
    fn test_regions_follow_raster_order() {
        let image = image_from_rows(&[
            "....##", //
            "....##", //
            "......", //
            "#.....", //
        ]);
        let regions = label_regions(&image);

        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].label, 1);
        assert_eq!(regions[0].area, 4);
        assert_relative_eq!(regions[0].centroid.0, 0.5);
        assert_relative_eq!(regions[0].centroid.1, 4.5);

        assert_eq!(regions[1].label, 2);
        assert_eq!(regions[1].area, 1);
        assert_relative_eq!(regions[1].centroid.0, 3.0);
        assert_relative_eq!(regions[1].centroid.1, 0.0);
    }

    #[test]
    fn test_u_shape_merges_into_single_label() {
        let image = image_from_rows(&["#.#", "#.#", "###"]);
        let regions = label_regions(&image);

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 7);
    }

    #[test]
    fn test_centroid_distance() {
        let a = Region {
            label: 1,
            area: 9,
            centroid: (2.0, 2.0),
        };
        let b = Region {
            label: 2,
            area: 9,
            centroid: (5.0, 6.0),
        };
        assert_relative_eq!(a.centroid_distance(&b), 5.0);
    }
}
