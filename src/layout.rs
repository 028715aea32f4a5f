//! Band-major ⇄ pixel-major reindexing.
//!
//! Both directions flatten the spatial axes in row-major order: pixel
//! `i = row * cols + col`. Values are copied unchanged.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3};

use crate::error::{Result, UnmixError};

/// Wrap a flat band-major buffer as a `bands × rows × cols` block.
pub fn block_from_vec<T>(data: Vec<T>, bands: usize, rows: usize, cols: usize) -> Result<Array3<T>> {
    let expected = bands * rows * cols;
    if data.len() != expected {
        return Err(UnmixError::Dimension {
            what: "pixel block",
            expected,
            found: data.len(),
        });
    }
    Array3::from_shape_vec((bands, rows, cols), data).map_err(|_| UnmixError::Dimension {
        what: "pixel block",
        expected,
        found: expected,
    })
}

/// `bands × rows × cols` → `(rows * cols) × bands`.
pub fn to_pixel_major<T: Copy>(block: ArrayView3<'_, T>) -> Array2<T> {
    let (bands, rows, cols) = block.dim();
    Array2::from_shape_fn((rows * cols, bands), |(pixel, band)| {
        block[[band, pixel / cols, pixel % cols]]
    })
}

/// `(rows * cols) × channels` → `channels × rows × cols`.
///
/// Fails when the matrix does not hold exactly `rows * cols` pixels.
pub fn to_band_major<T: Copy>(matrix: ArrayView2<'_, T>, rows: usize, cols: usize) -> Result<Array3<T>> {
    let (pixels, channels) = matrix.dim();
    if pixels != rows * cols {
        return Err(UnmixError::Dimension {
            what: "pixel matrix rows",
            expected: rows * cols,
            found: pixels,
        });
    }
    Ok(Array3::from_shape_fn((channels, rows, cols), |(channel, row, col)| {
        matrix[[row * cols + col, channel]]
    }))
}
