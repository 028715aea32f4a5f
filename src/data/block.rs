use std::path::Path;

use anyhow::{Context, Result};
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::error::UnmixError;
use crate::layout::block_from_vec;

/// JSON interchange form of a pixel block: flat band-major values plus shape.
///
/// ```json
/// { "bands": 2, "rows": 1, "cols": 2, "data": [3.0, 1.0, 4.0, 0.0] }
/// ```
///
/// `null` entries in `data` stand for non-finite values, which JSON cannot represent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockFile {
    pub bands: usize,
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Option<f64>>,
}

impl BlockFile {
    pub fn from_array<T: Copy + Into<f64>>(block: &Array3<T>) -> Self {
        let (bands, rows, cols) = block.dim();
        let data = block
            .iter()
            .map(|&v| {
                let v: f64 = v.into();
                v.is_finite().then_some(v)
            })
            .collect();
        BlockFile { bands, rows, cols, data }
    }

    /// Shape-checked conversion into a `bands × rows × cols` array.
    pub fn into_array(self) -> std::result::Result<Array3<f64>, UnmixError> {
        let data = self.data.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
        block_from_vec(data, self.bands, self.rows, self.cols)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading block file {}", path.display()))?;
        serde_json::from_str(&text).context("parsing block JSON")
    }
}
