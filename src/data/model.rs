use std::collections::HashSet;
use std::fmt;

use nalgebra::DMatrix;
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::description::parse_entries;
use crate::error::{Result, UnmixError};

// ---------------------------------------------------------------------------
// Endmember – one reference spectrum
// ---------------------------------------------------------------------------

/// A named reference spectrum, one value per input band.
#[derive(Debug, Clone, PartialEq)]
pub struct Endmember {
    pub name: String,
    pub values: Vec<f64>,
}

// ---------------------------------------------------------------------------
// SignatureTable – ordered endmembers plus the derived design matrix
// ---------------------------------------------------------------------------

/// Immutable, ordered set of endmember signatures.
///
/// Order is the order in which entries appeared in the source. It fixes both
/// the design matrix column order and the output band order, so it is never
/// re-sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureTable {
    endmembers: Vec<Endmember>,
    /// `B × E`, column `j` is endmember `j`.
    design: DMatrix<f64>,
}

impl SignatureTable {
    /// Parse a description such as `{'Veg': [16.9, 19.8], 'Shadow': [17.7, 11.6]}`.
    pub fn parse(description: &str) -> Result<Self> {
        Self::from_entries(parse_entries(description)?)
    }

    /// Build a table from `(name, values)` pairs, keeping their order.
    pub fn from_entries(entries: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let Some((_, first)) = entries.first() else {
            return Err(UnmixError::parse("no endmembers given"));
        };
        let band_count = first.len();

        let mut seen = HashSet::with_capacity(entries.len());
        for (name, values) in &entries {
            if name.is_empty() {
                return Err(UnmixError::parse("endmember name is empty"));
            }
            if !seen.insert(name.as_str()) {
                return Err(UnmixError::parse(format!("duplicate endmember '{name}'")));
            }
            if values.is_empty() {
                return Err(UnmixError::parse(format!("endmember '{name}' has no band values")));
            }
            if values.len() != band_count {
                return Err(UnmixError::parse(format!(
                    "endmember '{name}' has {} band values, expected {band_count}",
                    values.len()
                )));
            }
            if let Some(j) = values.iter().position(|v| !v.is_finite()) {
                return Err(UnmixError::parse(format!(
                    "endmember '{name}' band {j} is not a finite number"
                )));
            }
        }

        let endmembers: Vec<Endmember> = entries
            .into_iter()
            .map(|(name, values)| Endmember { name, values })
            .collect();

        let design = DMatrix::from_fn(band_count, endmembers.len(), |band, col| {
            endmembers[col].values[band]
        });

        Ok(SignatureTable { endmembers, design })
    }

    /// Endmembers in table order.
    pub fn endmembers(&self) -> &[Endmember] {
        &self.endmembers
    }

    /// Endmember names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.endmembers.iter().map(|e| e.name.as_str())
    }

    /// Name of the endmember at `index`, if any.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.endmembers.get(index).map(|e| e.name.as_str())
    }

    /// Position of an endmember by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.endmembers.iter().position(|e| e.name == name)
    }

    /// `B`: values per signature, i.e. input bands.
    pub fn band_count(&self) -> usize {
        self.design.nrows()
    }

    /// `E`: number of endmembers.
    pub fn endmember_count(&self) -> usize {
        self.endmembers.len()
    }

    /// The cached `B × E` design matrix.
    pub fn design_matrix(&self) -> &DMatrix<f64> {
        &self.design
    }

    /// Serialize back to a JSON description, preserving order.
    pub fn to_description(&self) -> String {
        // Map keys are strings and values are finite floats, so this cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Serialize for SignatureTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.endmembers.len()))?;
        for e in &self.endmembers {
            map.serialize_entry(&e.name, &e.values)?;
        }
        map.end()
    }
}

impl fmt::Display for SignatureTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.names().collect();
        write!(
            f,
            "{} endmembers x {} bands [{}]",
            self.endmember_count(),
            self.band_count(),
            names.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(m: &DMatrix<f64>, j: usize) -> Vec<f64> {
        m.column(j).iter().copied().collect()
    }

    #[test]
    fn test_design_matrix_columns_follow_table_order() {
        let table = SignatureTable::parse("{'A': [1, 2, 3], 'B': [4, 5, 6], 'C': [7, 8, 9]}").unwrap();
        let m = table.design_matrix();
        assert_eq!(m.shape(), (3, 3));
        assert_eq!(col(m, 0), [1.0, 2.0, 3.0]);
        assert_eq!(col(m, 1), [4.0, 5.0, 6.0]);
        assert_eq!(col(m, 2), [7.0, 8.0, 9.0]);
        assert_eq!(table.names().collect::<Vec<_>>(), ["A", "B", "C"]);
    }

    #[test]
    fn test_reordering_source_reorders_columns() {
        let table = SignatureTable::parse("{'C': [7, 8, 9], 'A': [1, 2, 3], 'B': [4, 5, 6]}").unwrap();
        let m = table.design_matrix();
        assert_eq!(col(m, 0), [7.0, 8.0, 9.0]);
        assert_eq!(col(m, 1), [1.0, 2.0, 3.0]);
        assert_eq!(table.position("B"), Some(2));
        assert_eq!(table.name(0), Some("C"));
    }

    #[test]
    fn test_counts() {
        let table = SignatureTable::parse("{'Veg': [1, 0], 'Shadow': [0, 1], 'Soil': [1, 1]}").unwrap();
        assert_eq!(table.band_count(), 2);
        assert_eq!(table.endmember_count(), 3);
        assert_eq!(table.to_string(), "3 endmembers x 2 bands [Veg, Shadow, Soil]");
    }

    #[test]
    fn test_rejects_empty_table() {
        assert!(matches!(SignatureTable::parse("{}"), Err(UnmixError::Parse(_))));
    }

    #[test]
    fn test_rejects_inconsistent_lengths() {
        let err = SignatureTable::parse("{'Veg': [1, 0, 2], 'Shadow': [0, 1]}").unwrap_err();
        assert!(matches!(err, UnmixError::Parse(ref m) if m.contains("Shadow")));
    }

    #[test]
    fn test_rejects_empty_vectors_and_names() {
        assert!(SignatureTable::parse("{'Veg': []}").is_err());
        assert!(SignatureTable::parse("{'': [1]}").is_err());
    }

    #[test]
    fn test_from_entries_rejects_non_finite() {
        let err = SignatureTable::from_entries(vec![("Veg".into(), vec![1.0, f64::NAN])]).unwrap_err();
        assert!(matches!(err, UnmixError::Parse(_)));
    }

    #[test]
    fn test_description_round_trip_keeps_order() {
        let table = SignatureTable::parse("{'Z': [1.5, 2], 'A': [3, 4.25]}").unwrap();
        let text = table.to_description();
        assert_eq!(text, r#"{"Z":[1.5,2.0],"A":[3.0,4.25]}"#);
        assert_eq!(SignatureTable::parse(&text).unwrap(), table);
    }
}
