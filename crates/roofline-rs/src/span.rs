//! Byte-span helpers for strided tensor layouts.
//!
//! The span of a tensor is the distance from its first to its last addressed element plus one
//! element. For non-contiguous or broadcast layouts this differs from `numel * itemsize`.

/// Returns the number of bytes spanned by a tensor with the given `sizes` and `strides`.
///
/// Dimensions of size 0 or 1 never extend the span, whatever their stride. An empty `sizes`
/// slice denotes a scalar with no footprint and yields 0.
///
/// `strides` must be at least as long as `sizes`. Arithmetic saturates at `usize::MAX`; use
/// [`checked_bytes_span_or_error`] to detect overflow instead. Geometries that come from
/// [`crate::geometry::TensorGeometry`] have already passed that check.
pub fn bytes_span(sizes: &[usize], strides: &[usize], itemsize: usize) -> usize {
    if sizes.is_empty() {
        return 0;
    }

    let mut output = 1usize;
    for (&size, &stride) in sizes.iter().zip(strides) {
        if size > 1 {
            output = output.saturating_add((size - 1).saturating_mul(stride));
        }
    }
    output.saturating_mul(itemsize)
}

/// Computes [`bytes_span`] with overflow checking.
pub fn checked_bytes_span_or_error<E, F>(
    sizes: &[usize],
    strides: &[usize],
    itemsize: usize,
    mut on_overflow: F,
) -> Result<usize, E>
where
    F: FnMut() -> E,
{
    if sizes.is_empty() {
        return Ok(0);
    }

    let mut output = 1usize;
    for (&size, &stride) in sizes.iter().zip(strides) {
        if size > 1 {
            let extent = (size - 1)
                .checked_mul(stride)
                .ok_or_else(&mut on_overflow)?;
            output = output.checked_add(extent).ok_or_else(&mut on_overflow)?;
        }
    }
    output.checked_mul(itemsize).ok_or_else(&mut on_overflow)
}

/// Computes `product(dims)` with overflow checking.
pub fn checked_element_count_or_error<E, F>(dims: &[usize], mut on_overflow: F) -> Result<usize, E>
where
    F: FnMut() -> E,
{
    let mut count = 1usize;
    for dim in dims {
        count = count.checked_mul(*dim).ok_or_else(&mut on_overflow)?;
    }
    Ok(count)
}

/// Builds row-major contiguous strides (in elements) for `dims`.
pub fn contiguous_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![0usize; dims.len()];
    let mut stride = 1usize;
    for axis in (0..dims.len()).rev() {
        strides[axis] = stride;
        stride = stride.saturating_mul(dims[axis]);
    }
    strides
}
