use log::{debug, warn};
use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};
use rayon::prelude::*;

use crate::config::UnmixConfig;
use crate::error::{Result, UnmixError};

// ---------------------------------------------------------------------------
// Unmixer – one SVD of the design matrix, applied to every pixel
// ---------------------------------------------------------------------------

/// Least-squares solver for `design · x ≈ pixel`, factored once per design matrix.
///
/// The design matrix is decomposed by SVD and turned into its Moore–Penrose
/// pseudo-inverse, with singular values at or below
/// `rcond · σ_max` treated as zero. Applying the pseudo-inverse gives the
/// minimum-norm least-squares solution, which stays well defined for
/// near-collinear spectra and for more endmembers than bands.
#[derive(Debug, Clone)]
pub struct Unmixer {
    /// `B × E`
    design: DMatrix<f64>,
    /// `E × B`
    pinv: DMatrix<f64>,
    singular_values: Vec<f64>,
    rank: usize,
    parallel: bool,
    min_parallel_pixels: usize,
}

impl Unmixer {
    pub fn new(design: &DMatrix<f64>, config: &UnmixConfig) -> Self {
        let (bands, endmembers) = design.shape();
        let svd = design.clone().svd(true, true);

        let singular_values: Vec<f64> = svd.singular_values.iter().copied().collect();
        let sigma_max = singular_values.iter().copied().fold(0.0, f64::max);
        let rcond = config
            .rcond
            .filter(|r| r.is_finite() && *r >= 0.0)
            .unwrap_or(bands.max(endmembers) as f64 * f64::EPSILON);
        let cutoff = rcond * sigma_max;
        let rank = singular_values.iter().filter(|&&s| s > cutoff).count();

        let pinv = match svd.pseudo_inverse(cutoff) {
            Ok(pinv) => pinv,
            Err(msg) => {
                warn!("pseudo-inverse failed ({msg}); every pixel will solve to zero");
                DMatrix::zeros(endmembers, bands)
            }
        };

        if rank < endmembers {
            warn!(
                "design matrix is rank deficient (rank {rank} of {endmembers} endmembers, {bands} bands); \
                 returning minimum-norm fractions"
            );
        }
        let sigma_min = singular_values
            .iter()
            .copied()
            .filter(|&s| s > cutoff)
            .fold(f64::INFINITY, f64::min);
        debug!(
            "factored {bands}x{endmembers} design matrix: rank {rank}, cutoff {cutoff:.3e}, condition {:.3e}",
            sigma_max / sigma_min
        );

        Unmixer {
            design: design.clone(),
            pinv,
            singular_values,
            rank,
            parallel: config.parallel,
            min_parallel_pixels: config.min_parallel_pixels,
        }
    }

    /// `B`
    pub fn band_count(&self) -> usize {
        self.design.nrows()
    }

    /// `E`
    pub fn endmember_count(&self) -> usize {
        self.design.ncols()
    }

    /// Numerical rank of the design matrix under the configured cutoff.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Singular values in descending order.
    pub fn singular_values(&self) -> &[f64] {
        &self.singular_values
    }

    pub fn is_rank_deficient(&self) -> bool {
        self.rank < self.endmember_count()
    }

    /// Solve every row of an `N × B` pixel matrix.
    ///
    /// Returns `N × (E + 1)`: the fractions followed by the residual sum of
    /// squares. Rows with a non-finite band value come back all-NaN.
    pub fn solve(&self, pixels: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let (n, bands) = pixels.dim();
        if bands != self.band_count() {
            return Err(UnmixError::Dimension {
                what: "pixel matrix bands",
                expected: self.band_count(),
                found: bands,
            });
        }

        let mut result = Array2::<f64>::zeros((n, self.endmember_count() + 1));
        let skipped = if self.parallel && n >= self.min_parallel_pixels {
            result
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .map(|(i, row)| self.solve_pixel(pixels.row(i), row))
                .filter(|solved| !solved)
                .count()
        } else {
            result
                .axis_iter_mut(Axis(0))
                .enumerate()
                .map(|(i, row)| self.solve_pixel(pixels.row(i), row))
                .filter(|solved| !solved)
                .count()
        };

        if skipped > 0 {
            warn!("{skipped} of {n} pixels had non-finite band values and were set to NaN");
        }
        Ok(result)
    }

    /// Solve a single pixel vector of length `B`.
    pub fn solve_one(&self, pixel: &[f64]) -> Result<Vec<f64>> {
        if pixel.len() != self.band_count() {
            return Err(UnmixError::Dimension {
                what: "pixel vector",
                expected: self.band_count(),
                found: pixel.len(),
            });
        }
        let mut out = vec![0.0; self.endmember_count() + 1];
        self.solve_pixel(ArrayView1::from(pixel), ArrayViewMut1::from(&mut out[..]));
        Ok(out)
    }

    /// Writes `[x_0 .. x_{E-1}, rss]` into `out`. Returns false for a NaN row.
    fn solve_pixel(&self, pixel: ArrayView1<'_, f64>, mut out: ArrayViewMut1<'_, f64>) -> bool {
        if pixel.iter().any(|v| !v.is_finite()) {
            out.fill(f64::NAN);
            return false;
        }

        let (bands, endmembers) = self.design.shape();
        for j in 0..endmembers {
            let mut acc = 0.0;
            for k in 0..bands {
                acc += self.pinv[(j, k)] * pixel[k];
            }
            out[j] = acc;
        }

        let mut rss = 0.0;
        for k in 0..bands {
            let mut fitted = 0.0;
            for j in 0..endmembers {
                fitted += self.design[(k, j)] * out[j];
            }
            let r = fitted - pixel[k];
            rss += r * r;
        }
        out[endmembers] = rss;
        true
    }
}
