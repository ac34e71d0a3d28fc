//! Plain-value tensor geometry captured from runtime tensor metadata.
//!
//! A [`TensorGeometry`] owns its size and stride vectors so that cost queries never hold a
//! reference into a live tensor.

use serde::{Deserialize, Serialize};

use crate::error::{RooflineError, RooflineResult, TensorRole};
use crate::span::{bytes_span, contiguous_strides};

/// Memory order of a rank-4 activation tensor whose logical dimensions are NCHW.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout4D {
    NCHW,
    NHWC,
}

impl Layout4D {
    /// Element strides for logical `[n, c, h, w]` dimensions stored in this memory order.
    ///
    /// Products saturate at `usize::MAX`; building a query from such a geometry then fails the
    /// span overflow check.
    pub fn strides(self, dims: [usize; 4]) -> [usize; 4] {
        let [_, c, h, w] = dims;
        let hw = h.saturating_mul(w);
        match self {
            Layout4D::NCHW => [c.saturating_mul(hw), hw, w, 1],
            Layout4D::NHWC => [hw.saturating_mul(c), 1, w.saturating_mul(c), c],
        }
    }
}

/// Sizes and element strides of one tensor.
///
/// Invariant: `sizes.len() == strides.len()`, and every stride is non-negative. Zero strides
/// are kept; they describe broadcast dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TensorGeometry {
    sizes: Vec<usize>,
    strides: Vec<usize>,
}

impl TensorGeometry {
    /// Validates `strides` against `sizes` and captures both.
    pub fn try_new(
        role: TensorRole,
        sizes: impl Into<Vec<usize>>,
        strides: &[i64],
    ) -> RooflineResult<Self> {
        let sizes = sizes.into();
        if sizes.len() != strides.len() {
            return Err(RooflineError::geometry(
                role,
                format!("{} sizes but {} strides", sizes.len(), strides.len()),
            ));
        }

        let mut unsigned = Vec::with_capacity(strides.len());
        for (axis, &stride) in strides.iter().enumerate() {
            let stride = usize::try_from(stride).map_err(|_| {
                RooflineError::geometry(role, format!("negative stride {stride} on axis {axis}"))
            })?;
            unsigned.push(stride);
        }

        Ok(TensorGeometry {
            sizes,
            strides: unsigned,
        })
    }

    /// Row-major contiguous geometry for `sizes`.
    pub fn contiguous(sizes: impl Into<Vec<usize>>) -> Self {
        let sizes = sizes.into();
        let strides = contiguous_strides(&sizes);
        TensorGeometry { sizes, strides }
    }

    /// Rank-4 geometry with logical NCHW `dims` stored in `layout` order.
    pub fn with_layout(dims: [usize; 4], layout: Layout4D) -> Self {
        TensorGeometry {
            sizes: dims.to_vec(),
            strides: layout.strides(dims).to_vec(),
        }
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn rank(&self) -> usize {
        self.sizes.len()
    }

    /// Element count, saturating at `usize::MAX`.
    pub fn num_elements(&self) -> usize {
        self.sizes
            .iter()
            .fold(1usize, |count, &size| count.saturating_mul(size))
    }

    /// Bytes spanned by this geometry for elements of `itemsize` bytes.
    pub fn bytes_span(&self, itemsize: usize) -> usize {
        bytes_span(&self.sizes, &self.strides, itemsize)
    }
}
