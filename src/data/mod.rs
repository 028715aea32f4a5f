/// Data layer: signature parsing, library loading and block interchange.
///
/// Architecture:
/// ```text
///  '{Veg: [...], ...}'      .json / .csv / .parquet
///        │                          │
///        ▼                          ▼
///   ┌─────────────┐           ┌──────────┐
///   │ description │ ◄──────── │  loader   │
///   └─────────────┘           └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ SignatureTable │  ordered endmembers, B × E design matrix
///   └────────────────┘
/// ```
///
/// `block` handles the JSON form of pixel blocks used by the CLI.

pub mod block;
pub mod description;
pub mod loader;
pub mod model;
