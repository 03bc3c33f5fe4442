//! Host-side views of score maps and masks.
//!
//! Region-based metrics need random access to individual pixels, so their inputs are
//! copied off the device once per update and viewed as a stack of `rows x cols` frames.

use burn::tensor::{backend::Backend, Bool, ElementConversion, Int, Tensor};
use region_ops::BinaryImage;

use crate::error::{MetricError, MetricResult};

/// Values copied to host memory, viewed as a stack of `rows x cols` frames.
#[derive(Debug, Clone)]
pub struct HostFrames {
    values: Vec<f32>,
    frames: usize,
    rows: usize,
    cols: usize,
}

impl HostFrames {
    /// View a tensor `[.., H, W]` as frames: the last two dimensions form the image plane
    /// and every leading dimension is flattened into the frame index.
    pub fn from_tensor<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> MetricResult<Self> {
        let dims = tensor.dims();
        if dims.len() < 2 {
            return Err(MetricError::InvalidShape {
                expected: "at least two dimensions [.., H, W]".to_string(),
                actual: format!("{dims:?}"),
            });
        }
        let rows = dims[dims.len() - 2];
        let cols = dims[dims.len() - 1];
        Self::from_tensor_with_plane(tensor, rows, cols)
    }

    /// View a tensor of any rank as consecutive row-major frames of `rows x cols`.
    ///
    /// The element count must be a positive multiple of `rows * cols`.
    pub fn from_tensor_with_plane<B: Backend, const D: usize>(
        tensor: Tensor<B, D>,
        rows: usize,
        cols: usize,
    ) -> MetricResult<Self> {
        let dims = tensor.dims();
        let numel = tensor.shape().num_elements();
        let plane = rows * cols;
        if plane == 0 || numel == 0 || numel % plane != 0 {
            return Err(MetricError::InvalidShape {
                expected: format!("a positive multiple of {rows}x{cols} elements"),
                actual: format!("{dims:?}"),
            });
        }

        Ok(Self {
            values: float_to_host(tensor)?,
            frames: numel / plane,
            rows,
            cols,
        })
    }

    pub const fn frames(&self) -> usize {
        self.frames
    }

    pub const fn rows(&self) -> usize {
        self.rows
    }

    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major values of frame `index`.
    pub fn frame(&self, index: usize) -> &[f32] {
        let plane = self.rows * self.cols;
        &self.values[index * plane..(index + 1) * plane]
    }

    /// Binarize frame `index`, foreground where `predicate` holds.
    pub fn binarize<F>(&self, index: usize, predicate: F) -> MetricResult<BinaryImage>
    where
        F: Fn(f32) -> bool,
    {
        Ok(BinaryImage::from_slice(
            self.frame(index),
            self.rows,
            self.cols,
            predicate,
        )?)
    }
}

/// Copy a float tensor to host memory in row-major order.
pub(crate) fn float_to_host<B: Backend, const D: usize>(
    tensor: Tensor<B, D>,
) -> MetricResult<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|err| MetricError::TensorData {
            reason: format!("{err:?}"),
        })
}

/// Copy an integer tensor to host memory in row-major order.
pub(crate) fn int_to_host<B: Backend, const D: usize>(
    tensor: Tensor<B, D, Int>,
) -> MetricResult<Vec<i64>> {
    tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|err| MetricError::TensorData {
            reason: format!("{err:?}"),
        })
}

/// Number of `true` elements in a boolean tensor.
pub(crate) fn count_true<B: Backend, const D: usize>(mask: Tensor<B, D, Bool>) -> u64 {
    mask.int().sum().into_scalar().elem::<i64>().max(0) as u64
}

/// Number of positions where both boolean tensors are `true`.
pub(crate) fn count_both<B: Backend, const D: usize>(
    lhs: Tensor<B, D, Bool>,
    rhs: Tensor<B, D, Bool>,
) -> u64 {
    (lhs.int() * rhs.int())
        .sum()
        .into_scalar()
        .elem::<i64>()
        .max(0) as u64
}

/// Fails with [`MetricError::ShapeMismatch`] unless both tensors have the same shape.
pub(crate) fn ensure_same_shape<B: Backend, const D: usize, K1, K2>(
    prediction: &Tensor<B, D, K1>,
    target: &Tensor<B, D, K2>,
) -> MetricResult<()>
where
    K1: burn::tensor::BasicOps<B>,
    K2: burn::tensor::BasicOps<B>,
{
    let (prediction, target) = (prediction.dims(), target.dims());
    if prediction != target {
        return Err(MetricError::ShapeMismatch {
            prediction: format!("{prediction:?}"),
            target: format!("{target:?}"),
        });
    }
    Ok(())
}
