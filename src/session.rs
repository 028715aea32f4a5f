use log::{debug, info};
use ndarray::{Array2, Array3, ArrayView3};
use serde::Serialize;

use crate::assemble::{assemble, BandStatistics};
use crate::config::{HostConfiguration, UnmixConfig};
use crate::data::model::SignatureTable;
use crate::error::{Result, UnmixError};
use crate::layout::to_pixel_major;
use crate::metadata::{self, BandMetadata, BandScope, DatasetMetadata, KeyMetadata};
use crate::solver::Unmixer;

// ---------------------------------------------------------------------------
// Output shape declaration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PixelType {
    #[serde(rename = "f4")]
    F32,
}

/// What the host needs to know before any pixels flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputInfo {
    pub band_count: usize,
    pub pixel_type: PixelType,
    /// Left empty; the host recomputes statistics for derived rasters.
    pub statistics: Vec<BandStatistics>,
    pub histogram: Vec<Vec<u64>>,
}

// ---------------------------------------------------------------------------
// UnmixSession – immutable context shared by all phases
// ---------------------------------------------------------------------------

/// Everything derived from the signature parameter, built once.
///
/// The same session answers the shape declaration, every pixel block and
/// every metadata query. It is `Sync`, so blocks may be processed from
/// several threads against one session.
#[derive(Debug, Clone)]
pub struct UnmixSession {
    table: SignatureTable,
    unmixer: Unmixer,
    config: UnmixConfig,
}

impl UnmixSession {
    /// Parse `description` and factor its design matrix.
    pub fn new(description: &str, config: UnmixConfig) -> Result<Self> {
        Ok(Self::from_table(SignatureTable::parse(description)?, config))
    }

    pub fn from_table(table: SignatureTable, config: UnmixConfig) -> Self {
        let unmixer = Unmixer::new(table.design_matrix(), &config);
        info!("unmixing session ready: {table}");
        UnmixSession { table, unmixer, config }
    }

    pub fn table(&self) -> &SignatureTable {
        &self.table
    }

    pub fn unmixer(&self) -> &Unmixer {
        &self.unmixer
    }

    pub fn config(&self) -> &UnmixConfig {
        &self.config
    }

    pub fn output_info(&self) -> OutputInfo {
        OutputInfo {
            band_count: self.table.endmember_count() + 1,
            pixel_type: PixelType::F32,
            statistics: Vec::new(),
            histogram: Vec::new(),
        }
    }

    pub fn host_configuration(&self) -> HostConfiguration {
        HostConfiguration::default()
    }

    /// Unmix one `B × H × W` block into a new `(E + 1) × H × W` block.
    ///
    /// The band count must match the signatures; any other `H × W` is accepted.
    pub fn process_block<T>(&self, block: ArrayView3<'_, T>) -> Result<Array3<f32>>
    where
        T: Copy + Into<f64>,
    {
        let (bands, rows, cols) = block.dim();
        if bands != self.table.band_count() {
            return Err(UnmixError::Dimension {
                what: "pixel block bands",
                expected: self.table.band_count(),
                found: bands,
            });
        }

        let pixels: Array2<f64> = to_pixel_major(block).mapv(Into::into);
        let result = self.unmixer.solve(pixels.view())?;
        let out = assemble(&result, rows, cols)?;
        debug!("unmixed {rows}x{cols} block ({bands} bands -> {} bands)", out.dim().0);
        Ok(out)
    }

    pub fn describe_band(&self, band_index: usize) -> Result<BandMetadata> {
        metadata::describe_band(&self.table, band_index)
    }

    pub fn describe_dataset(&self) -> DatasetMetadata {
        metadata::describe_dataset()
    }

    /// Answer a host metadata query; `-1` addresses the dataset.
    pub fn key_metadata(&self, host_index: i64) -> Result<KeyMetadata> {
        let scope = BandScope::from_host_index(host_index, self.table.endmember_count())?;
        metadata::describe(&self.table, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SIGNATURES;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Axis};

    fn veg_shadow() -> UnmixSession {
        UnmixSession::new("{'Veg': [1, 0], 'Shadow': [0, 1]}", UnmixConfig::default()).unwrap()
    }

    #[test]
    fn test_single_pixel_end_to_end() {
        let session = veg_shadow();
        let block = array![[[3.0]], [[4.0]]];
        let out = session.process_block(block.view()).unwrap();
        assert_eq!(out.dim(), (3, 1, 1));
        assert_abs_diff_eq!(out[[0, 0, 0]], 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out[[1, 0, 0]], 4.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out[[2, 0, 0]], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_reordered_signatures_reorder_bands() {
        let swapped =
            UnmixSession::new("{'Shadow': [0, 1], 'Veg': [1, 0]}", UnmixConfig::default()).unwrap();
        let block = array![[[3.0]], [[4.0]]];

        let a = veg_shadow().process_block(block.view()).unwrap();
        let b = swapped.process_block(block.view()).unwrap();
        assert_abs_diff_eq!(a[[0, 0, 0]], 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(a[[1, 0, 0]], 4.0, epsilon = 1e-6);
        assert_abs_diff_eq!(b[[0, 0, 0]], 4.0, epsilon = 1e-6);
        assert_abs_diff_eq!(b[[1, 0, 0]], 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(b[[2, 0, 0]], 0.0, epsilon = 1e-6);
        assert_eq!(swapped.describe_band(0).unwrap().band_name, "Shadow");
        assert_eq!(swapped.describe_band(1).unwrap().band_name, "Veg");
    }

    #[test]
    fn test_output_info() {
        let info = veg_shadow().output_info();
        assert_eq!(info.band_count, 3);
        assert_eq!(info.pixel_type, PixelType::F32);
        assert!(info.statistics.is_empty() && info.histogram.is_empty());
        assert_eq!(serde_json::to_value(&info).unwrap()["pixelType"], "f4");
    }

    #[test]
    fn test_metadata_queries() {
        let session = veg_shadow();
        assert_eq!(session.describe_band(0).unwrap().band_name, "Veg");
        assert_eq!(session.describe_band(1).unwrap().band_name, "Shadow");
        assert_eq!(session.describe_band(2).unwrap().band_name, "Residuals");
        assert!(matches!(session.describe_band(3), Err(UnmixError::Index { .. })));
        assert_eq!(session.describe_dataset().data_type, "Processed");
        assert!(matches!(session.key_metadata(-1).unwrap(), KeyMetadata::Dataset(_)));
        assert!(session.key_metadata(3).is_err());
    }

    #[test]
    fn test_rejects_wrong_band_count() {
        let session = veg_shadow();
        let block = Array3::<f32>::zeros((3, 2, 2));
        assert!(matches!(
            session.process_block(block.view()),
            Err(UnmixError::Dimension { expected: 2, found: 3, .. })
        ));
    }

    #[test]
    fn test_parse_error_surfaces_before_processing() {
        let err = UnmixSession::new("{'Veg': [1, 0], 'Shadow': [0]}", UnmixConfig::default()).unwrap_err();
        assert!(matches!(err, UnmixError::Parse(_)));
    }

    #[test]
    fn test_spatial_alignment_and_nan_isolation() {
        let session = UnmixSession::new(DEFAULT_SIGNATURES, UnmixConfig::default()).unwrap();
        let design = session.table().design_matrix().clone();
        let (rows, cols) = (3, 4);

        // Fractions vary with position so a transposed layout would be caught.
        let fractions = |r: usize, c: usize| {
            let a = 0.1 * r as f64;
            let b = 0.05 * c as f64;
            [a, b, 0.3, 1.0 - a - b - 0.3]
        };
        let mut block = Array3::<f32>::zeros((6, rows, cols));
        for r in 0..rows {
            for c in 0..cols {
                let x = fractions(r, c);
                for k in 0..6 {
                    let v: f64 = (0..4).map(|j| design[(k, j)] * x[j]).sum();
                    block[[k, r, c]] = v as f32;
                }
            }
        }
        block[[4, 1, 2]] = f32::NAN;

        let out = session.process_block(block.view()).unwrap();
        assert_eq!(out.dim(), (5, rows, cols));
        for r in 0..rows {
            for c in 0..cols {
                let px = out.index_axis(Axis(1), r).index_axis(Axis(1), c).to_vec();
                if (r, c) == (1, 2) {
                    assert!(px.iter().all(|v| v.is_nan()));
                    continue;
                }
                for (got, want) in px.iter().zip(fractions(r, c)) {
                    assert_abs_diff_eq!(*got as f64, want, epsilon = 1e-4);
                }
                assert!(px[4] < 1e-6);
            }
        }
    }

    #[test]
    fn test_integer_blocks_are_accepted() {
        let session = veg_shadow();
        let block = array![[[3u16, 1]], [[4u16, 0]]];
        let out = session.process_block(block.view()).unwrap();
        assert_eq!(out.dim(), (3, 1, 2));
        assert_abs_diff_eq!(out[[0, 0, 1]], 1.0, epsilon = 1e-6);
    }
}
