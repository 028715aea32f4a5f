use ndarray::{Array2, Array3, Axis};
use serde::Serialize;

use crate::error::Result;
use crate::layout::to_band_major;

/// Reshape an `N × (E + 1)` result matrix into the `(E + 1) × rows × cols`
/// output block, converting to `f32` as the last step.
///
/// Finite values beyond the `f32` range saturate to `±f32::MAX` instead of
/// becoming infinite; NaN passes through.
pub fn assemble(result: &Array2<f64>, rows: usize, cols: usize) -> Result<Array3<f32>> {
    let block = to_band_major(result.view(), rows, cols)?;
    Ok(block.mapv(to_output_f32))
}

fn to_output_f32(v: f64) -> f32 {
    if v.is_finite() {
        v.clamp(f32::MIN as f64, f32::MAX as f64) as f32
    } else {
        v as f32
    }
}

/// Summary of one output band over its finite values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Number of NaN/infinite pixels left out of the summary.
    pub non_finite: usize,
}

/// Per-band statistics of an output block; `None` for a band with no finite pixel.
pub fn band_statistics(block: &Array3<f32>) -> Vec<Option<BandStatistics>> {
    block
        .axis_iter(Axis(0))
        .map(|band| {
            let mut n = 0usize;
            let mut sum = 0.0f64;
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for &v in band.iter().filter(|v| v.is_finite()) {
                let v = v as f64;
                n += 1;
                sum += v;
                min = min.min(v);
                max = max.max(v);
            }
            if n == 0 {
                return None;
            }
            let mean = sum / n as f64;
            let var = band
                .iter()
                .filter(|v| v.is_finite())
                .map(|&v| (v as f64 - mean).powi(2))
                .sum::<f64>()
                / n as f64;
            Some(BandStatistics {
                min,
                max,
                mean,
                std_dev: var.sqrt(),
                non_finite: band.len() - n,
            })
        })
        .collect()
}
