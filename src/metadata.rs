use serde::Serialize;

use crate::data::model::SignatureTable;
use crate::error::{Result, UnmixError};

/// Host band index that addresses the dataset rather than a band.
pub const DATASET_SENTINEL: i64 = -1;

pub const RESIDUAL_BAND_NAME: &str = "Residuals";

/// Dataset-level data type of every unmixing output.
pub const PROCESSED_DATA_TYPE: &str = "Processed";

/// What a metadata query is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandScope {
    Dataset,
    Band(usize),
}

impl BandScope {
    /// Interpret a host band index for a table with `endmembers` entries.
    pub fn from_host_index(index: i64, endmembers: usize) -> Result<Self> {
        if index == DATASET_SENTINEL {
            return Ok(BandScope::Dataset);
        }
        match usize::try_from(index) {
            Ok(band) if band <= endmembers => Ok(BandScope::Band(band)),
            _ => Err(UnmixError::Index { index, max: endmembers }),
        }
    }
}

/// Key metadata for one output band.
///
/// Wavelength bounds are always `None`: output bands are fractions and
/// residuals, not sensor bands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandMetadata {
    #[serde(rename = "bandindex")]
    pub band_index: usize,
    #[serde(rename = "bandname")]
    pub band_name: String,
    #[serde(rename = "wavelengthmin")]
    pub wavelength_min: Option<f64>,
    #[serde(rename = "wavelengthmax")]
    pub wavelength_max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetMetadata {
    #[serde(rename = "datatype")]
    pub data_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KeyMetadata {
    Dataset(DatasetMetadata),
    Band(BandMetadata),
}

/// Metadata for output band `band_index`: endmember bands first, then the
/// residual band at index `E`.
pub fn describe_band(table: &SignatureTable, band_index: usize) -> Result<BandMetadata> {
    let endmembers = table.endmember_count();
    let band_name = match table.name(band_index) {
        Some(name) => name.to_string(),
        None if band_index == endmembers => RESIDUAL_BAND_NAME.to_string(),
        None => {
            return Err(UnmixError::Index {
                index: i64::try_from(band_index).unwrap_or(i64::MAX),
                max: endmembers,
            })
        }
    };
    Ok(BandMetadata {
        band_index,
        band_name,
        wavelength_min: None,
        wavelength_max: None,
    })
}

pub fn describe_dataset() -> DatasetMetadata {
    DatasetMetadata { data_type: PROCESSED_DATA_TYPE }
}

pub fn describe(table: &SignatureTable, scope: BandScope) -> Result<KeyMetadata> {
    match scope {
        BandScope::Dataset => Ok(KeyMetadata::Dataset(describe_dataset())),
        BandScope::Band(band) => describe_band(table, band).map(KeyMetadata::Band),
    }
}

/// Metadata for every output band, in band order.
pub fn describe_all_bands(table: &SignatureTable) -> Vec<BandMetadata> {
    (0..=table.endmember_count())
        .filter_map(|band| describe_band(table, band).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn veg_shadow() -> SignatureTable {
        SignatureTable::parse("{'Veg': [1, 0], 'Shadow': [0, 1]}").unwrap()
    }

    #[test]
    fn test_band_names_follow_table_then_residuals() {
        let table = veg_shadow();
        assert_eq!(describe_band(&table, 0).unwrap().band_name, "Veg");
        assert_eq!(describe_band(&table, 1).unwrap().band_name, "Shadow");
        assert_eq!(describe_band(&table, 2).unwrap().band_name, "Residuals");
        assert_eq!(
            describe_band(&table, 3).unwrap_err(),
            UnmixError::Index { index: 3, max: 2 }
        );
    }

    #[test]
    fn test_wavelengths_unset() {
        let md = describe_band(&veg_shadow(), 1).unwrap();
        assert_eq!(md.wavelength_min, None);
        assert_eq!(md.wavelength_max, None);
    }

    #[test]
    fn test_host_index_scopes() {
        assert_eq!(BandScope::from_host_index(-1, 2).unwrap(), BandScope::Dataset);
        assert_eq!(BandScope::from_host_index(2, 2).unwrap(), BandScope::Band(2));
        assert!(matches!(BandScope::from_host_index(3, 2), Err(UnmixError::Index { index: 3, .. })));
        assert!(matches!(BandScope::from_host_index(-2, 2), Err(UnmixError::Index { index: -2, .. })));
    }

    #[test]
    fn test_dataset_scope_is_processed() {
        let md = describe(&veg_shadow(), BandScope::Dataset).unwrap();
        assert_eq!(md, KeyMetadata::Dataset(DatasetMetadata { data_type: "Processed" }));
    }

    #[test]
    fn test_serialized_keys() {
        let md = describe(&veg_shadow(), BandScope::Band(2)).unwrap();
        let json = serde_json::to_value(&md).unwrap();
        assert_eq!(json["bandname"], "Residuals");
        assert!(json["wavelengthmin"].is_null());
        assert_eq!(serde_json::to_string(&describe_dataset()).unwrap(), r#"{"datatype":"Processed"}"#);
    }

    #[test]
    fn test_describe_all_bands() {
        let names: Vec<String> = describe_all_bands(&veg_shadow())
            .into_iter()
            .map(|b| b.band_name)
            .collect();
        assert_eq!(names, ["Veg", "Shadow", "Residuals"]);
    }
}
