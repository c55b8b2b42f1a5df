//! `traffic-survey` library crate.
//!
//! The binary (`survey`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the data layer (override store, remote source, per-category resolution)
//!   can be driven by other front-ends than the CLI and TUI

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod series;
pub mod tui;
