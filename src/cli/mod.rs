//! Command-line parsing for the survey dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the data and series code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::DEFAULT_DATE;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "survey", version, about = "Traffic, parking and weather survey dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve every category once and print a text report.
    Show(DashboardArgs),
    /// Launch the interactive TUI.
    ///
    /// Uses the same dashboard state as `survey show`, but fetches in the
    /// background and lets you change date and uploads while it runs.
    Tui(DashboardArgs),
    /// Write a synthetic survey day as upload-ready CSV files.
    Sample(SampleArgs),
}

/// Options shared by `show` and `tui`.
#[derive(Debug, Args, Clone)]
pub struct DashboardArgs {
    /// Survey date (YYYY-MM-DD).
    #[arg(short = 'd', long, default_value = DEFAULT_DATE, conflicts_with = "all_dates")]
    pub date: String,

    /// Select every date instead of a single day.
    #[arg(long)]
    pub all_dates: bool,

    /// Survey API base URL (overrides SURVEY_API_BASE_URL).
    #[arg(long, value_name = "URL")]
    pub api_base: Option<String>,

    /// Request timeout in seconds (overrides SURVEY_API_TIMEOUT_SECS; none by default).
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Upload a traffic CSV as override data.
    #[arg(long, value_name = "CSV")]
    pub traffic_csv: Option<PathBuf>,

    /// Upload a parking CSV as override data.
    #[arg(long, value_name = "CSV")]
    pub parking_csv: Option<PathBuf>,

    /// Upload a weather CSV as override data.
    #[arg(long, value_name = "CSV")]
    pub weather_csv: Option<PathBuf>,

    /// Export the resolved dashboard view to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

/// Options for generating a synthetic day.
#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Survey date (YYYY-MM-DD).
    #[arg(short = 'd', long, default_value = DEFAULT_DATE)]
    pub date: String,

    /// Random seed (combined with the date for reproducibility).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Directory receiving traffic.csv, parking.csv and weather.csv.
    #[arg(long, value_name = "DIR")]
    pub out_dir: PathBuf,
}
