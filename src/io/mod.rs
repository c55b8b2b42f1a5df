//! Input/output helpers.
//!
//! - CSV ingest for override uploads (`ingest`)
//! - dashboard JSON and sample CSV exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
