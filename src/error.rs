use thiserror::Error;

/// Failures raised by the unmixing core.
///
/// * `Parse` aborts session setup; no table is produced.
/// * `Dimension` rejects a whole block.
/// * `Index` fails a single metadata query.
///
/// Numeric trouble inside one pixel (NaN input, singular design matrix) is
/// never reported here; it shows up as NaN or minimum-norm values in that
/// pixel's output instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnmixError {
    #[error("invalid signature description: {0}")]
    Parse(String),

    #[error("dimension mismatch in {what}: expected {expected}, found {found}")]
    Dimension {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("band index {index} out of range (valid: 0..={max} or -1 for the dataset)")]
    Index { index: i64, max: usize },
}

impl UnmixError {
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        UnmixError::Parse(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, UnmixError>;
