use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Solver configuration
// ---------------------------------------------------------------------------

/// Tunables for a session. Every field has a default, so `{}` is a valid
/// configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnmixConfig {
    /// Relative cutoff for small singular values. `None` uses
    /// `max(bands, endmembers) * f64::EPSILON`.
    pub rcond: Option<f64>,
    /// Solve pixel rows on the rayon pool.
    pub parallel: bool,
    /// Blocks with fewer pixels than this are solved on the calling thread.
    pub min_parallel_pixels: usize,
}

impl Default for UnmixConfig {
    fn default() -> Self {
        Self {
            rcond: None,
            parallel: true,
            min_parallel_pixels: 4096,
        }
    }
}

impl UnmixConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parsing unmix configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        Self::from_json_str(&text)
    }
}

// ---------------------------------------------------------------------------
// Host-facing configuration
// ---------------------------------------------------------------------------

/// Raster properties the host may inherit from or invalidate on the input.
pub mod raster_property {
    pub const PIXEL_TYPE: u32 = 1;
    pub const NODATA: u32 = 2;
    pub const DIMENSIONS: u32 = 4;
    pub const RESAMPLING: u32 = 8;

    pub const STATISTICS: u32 = 2;
    pub const HISTOGRAM: u32 = 4;
    pub const KEY_PROPERTIES: u32 = 8;
}

/// Fixed answer to the host's configuration query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfiguration {
    pub composite_rasters: bool,
    pub inherit_properties: u32,
    pub invalidate_properties: u32,
    pub input_mask: bool,
}

impl Default for HostConfiguration {
    fn default() -> Self {
        use raster_property::*;
        Self {
            composite_rasters: false,
            inherit_properties: PIXEL_TYPE | NODATA | DIMENSIONS | RESAMPLING,
            invalidate_properties: STATISTICS | HISTOGRAM | KEY_PROPERTIES,
            input_mask: false,
        }
    }
}

/// Training-site means for a six-band sensor (B, G, R, NIR, SWIR1, SWIR2).
pub const DEFAULT_SIGNATURES: &str = "{'Veg': [16.91479, 19.83083, 14.53383, 93.16165, 41.97619, 18.11779], \
'Shadow': [17.78413, 11.62528, 5.50679, 8.22514, 0.72993, 0.14649], \
'NPV': [17.45967, 17.11275, 16.30269, 26.19254, 40.90807, 45.67303], \
'Soil': [50.17609, 60.45217, 67.33043, 83.83261, 93.41739, 81.16739]}";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::SignatureTable;

    #[test]
    fn test_empty_json_gives_defaults() {
        assert_eq!(UnmixConfig::from_json_str("{}").unwrap(), UnmixConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let cfg = UnmixConfig::from_json_str(r#"{"rcond": 1e-6, "parallel": false}"#).unwrap();
        assert_eq!(cfg.rcond, Some(1e-6));
        assert!(!cfg.parallel);
        assert_eq!(cfg.min_parallel_pixels, 4096);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(UnmixConfig::from_json_str(r#"{"rcnod": 1}"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unmix.json");
        std::fs::write(&path, r#"{"min_parallel_pixels": 16}"#).unwrap();
        assert_eq!(UnmixConfig::load(&path).unwrap().min_parallel_pixels, 16);
    }

    #[test]
    fn test_host_configuration_flags() {
        let host = HostConfiguration::default();
        assert_eq!(host.inherit_properties, 15);
        assert_eq!(host.invalidate_properties, 14);
        assert!(!host.composite_rasters && !host.input_mask);
        let json = serde_json::to_value(host).unwrap();
        assert_eq!(json["inheritProperties"], 15);
    }

    #[test]
    fn test_default_signatures_parse() {
        let table = SignatureTable::parse(DEFAULT_SIGNATURES).unwrap();
        assert_eq!(table.names().collect::<Vec<_>>(), ["Veg", "Shadow", "NPV", "Soil"]);
        assert_eq!(table.band_count(), 6);
    }
}
