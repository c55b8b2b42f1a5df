//! Domain types used throughout the dashboard.
//!
//! This module defines:
//!
//! - the three record categories and their row shapes (`types`)
//! - structural classification of untyped rows into those shapes (`schema`)

pub mod schema;
pub mod types;

pub use schema::*;
pub use types::*;
