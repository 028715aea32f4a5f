//! Linear spectral unmixing of multi-band raster blocks.
//!
//! Each pixel of a `bands × rows × cols` block is expressed as the
//! least-squares linear combination of a fixed set of endmember spectra. The
//! output block has one band per endmember, in signature order, followed by
//! a residual band holding the sum of squared misfit.
//!
//! ```text
//!  block B×H×W ──layout──► pixels (H·W)×B ──solver──► (H·W)×(E+1) ──assemble──► (E+1)×H×W f32
//!                                              ▲
//!                    SignatureTable ── design matrix B×E (factored once)
//! ```
//!
//! [`UnmixSession`] ties the pieces together for one signature parameter.

pub mod assemble;
pub mod config;
pub mod data;
pub mod error;
pub mod layout;
pub mod metadata;
pub mod session;
pub mod solver;

pub use config::UnmixConfig;
pub use data::model::SignatureTable;
pub use error::UnmixError;
pub use session::UnmixSession;
