//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and `.env`
//! - loads uploaded CSV files into the override store
//! - resolves each category (upload or survey API)
//! - prints reports / runs the TUI
//! - writes optional exports

use std::time::Duration;

use chrono::NaiveDate;
use clap::Parser;

use crate::cli::{Command, DashboardArgs, SampleArgs};
use crate::data::remote::RemoteClient;
use crate::domain::{Category, DEFAULT_API_BASE_URL, DashboardConfig};
use crate::error::AppError;

pub mod pipeline;

use pipeline::Dashboard;

/// Environment variable naming the survey API base URL.
pub const ENV_API_BASE_URL: &str = "SURVEY_API_BASE_URL";
/// Environment variable holding the request timeout in seconds.
pub const ENV_API_TIMEOUT_SECS: &str = "SURVEY_API_TIMEOUT_SECS";

/// Entry point for the `survey` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is normal.
    dotenvy::dotenv().ok();

    // We want `survey` and `survey --date D` to behave like `survey tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Show(args) => handle_show(args),
        Command::Tui(args) => handle_tui(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_show(args: DashboardArgs) -> Result<(), AppError> {
    let config = dashboard_config_from_args(&args, |key| std::env::var(key).ok())?;
    let client = RemoteClient::from_config(&config)?;
    log::info!("survey API: {}", client.base_url());

    let mut dashboard = Dashboard::new(config.date.clone());
    for line in load_uploads(&mut dashboard, &config)? {
        println!("{line}");
    }

    dashboard.resolve_blocking(&client);
    let view = dashboard.view();
    println!("{}", crate::report::format_dashboard(&view));

    if let Some(path) = &config.export {
        crate::io::export::write_view_json(path, &view)?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}

fn handle_tui(args: DashboardArgs) -> Result<(), AppError> {
    let config = dashboard_config_from_args(&args, |key| std::env::var(key).ok())?;
    crate::tui::run(config)
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let date = parse_date(&args.date)?;
    let day = crate::data::sample::generate_day(date, args.seed)?;
    let files = crate::io::export::write_sample_csvs(&args.out_dir, &day)?;

    println!(
        "Wrote {} traffic, {} parking and {} weather row(s) for {date}:",
        day.traffic.len(),
        day.parking.len(),
        day.weather.len()
    );
    for path in [&files.traffic, &files.parking, &files.weather] {
        println!("  {}", path.display());
    }
    Ok(())
}

/// Upload every CSV named in `config` and return one summary line per file.
pub fn load_uploads(dashboard: &mut Dashboard, config: &DashboardConfig) -> Result<Vec<String>, AppError> {
    let mut lines = Vec::new();
    for category in Category::ALL {
        let Some(path) = config.csv_path(category) else {
            continue;
        };
        lines.push(upload_csv(dashboard, category, path)?);
    }
    Ok(lines)
}

/// Read `path` and make it `category`'s override.
pub fn upload_csv(dashboard: &mut Dashboard, category: Category, path: &std::path::Path) -> Result<String, AppError> {
    let csv = crate::io::ingest::read_csv_rows(path)?;
    for e in &csv.row_errors {
        log::warn!("{}:{}: {}", path.display(), e.line, e.message);
    }
    let summary = dashboard.upload(category, csv.rows);
    Ok(crate::report::format_upload_summary(&summary))
}

/// Build the session configuration.
///
/// Precedence: CLI flag, then `env`, then built-in default.
pub fn dashboard_config_from_args(
    args: &DashboardArgs,
    env: impl Fn(&str) -> Option<String>,
) -> Result<DashboardConfig, AppError> {
    let api_base_url = args
        .api_base
        .clone()
        .or_else(|| env(ENV_API_BASE_URL).filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

    let timeout_secs = match args.timeout_secs {
        Some(secs) => Some(secs),
        None => match env(ENV_API_TIMEOUT_SECS).filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                AppError::new(2, format!("Invalid {ENV_API_TIMEOUT_SECS} '{raw}': {e}"))
            })?),
            None => None,
        },
    };

    let date = if args.all_dates {
        None
    } else {
        Some(parse_date(&args.date)?.format("%Y-%m-%d").to_string())
    };

    Ok(DashboardConfig {
        api_base_url,
        timeout: timeout_secs.map(Duration::from_secs),
        date,
        traffic_csv: args.traffic_csv.clone(),
        parking_csv: args.parking_csv.clone(),
        weather_csv: args.weather_csv.clone(),
        export: args.export.clone(),
    })
}

/// Parse a `YYYY-MM-DD` survey date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|e| AppError::new(2, format!("Invalid date '{trimmed}' (expected YYYY-MM-DD): {e}")))
}

/// Rewrite argv so `survey` defaults to `survey tui`.
///
/// Rules:
/// - `survey`                      -> `survey tui`
/// - `survey --date D ...`         -> `survey tui --date D ...`
/// - `survey --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "show" | "tui" | "sample");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;
    use crate::cli::Cli;

    fn args(extra: &[&str]) -> DashboardArgs {
        let mut argv = vec!["survey", "show"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Show(args) => args,
            other => panic!("expected show, got {other:?}"),
        }
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_runs_the_tui() {
        assert_eq!(rewrite_args(argv(&["survey"])), argv(&["survey", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["survey", "--all-dates"])),
            argv(&["survey", "tui", "--all-dates"])
        );
        assert_eq!(rewrite_args(argv(&["survey", "show"])), argv(&["survey", "show"]));
        assert_eq!(rewrite_args(argv(&["survey", "--help"])), argv(&["survey", "--help"]));
    }

    #[test]
    fn flag_beats_env_beats_default() {
        let config = dashboard_config_from_args(&args(&[]), env(&[])).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.timeout, None);
        assert_eq!(config.date.as_deref(), Some("2024-01-15"));

        let vars = env(&[(ENV_API_BASE_URL, "http://env:9000/api"), (ENV_API_TIMEOUT_SECS, "5")]);
        let config = dashboard_config_from_args(&args(&[]), vars).unwrap();
        assert_eq!(config.api_base_url, "http://env:9000/api");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));

        let vars = env(&[(ENV_API_BASE_URL, "http://env:9000/api"), (ENV_API_TIMEOUT_SECS, "5")]);
        let config = dashboard_config_from_args(
            &args(&["--api-base", "http://flag/api", "--timeout-secs", "9"]),
            vars,
        )
        .unwrap();
        assert_eq!(config.api_base_url, "http://flag/api");
        assert_eq!(config.timeout, Some(Duration::from_secs(9)));
    }

    #[test]
    fn all_dates_clears_the_date() {
        let config = dashboard_config_from_args(&args(&["--all-dates"]), env(&[])).unwrap();
        assert_eq!(config.date, None);
    }

    #[test]
    fn bad_inputs_are_input_errors() {
        let err = dashboard_config_from_args(&args(&["--date", "15/01/2024"]), env(&[])).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = dashboard_config_from_args(&args(&[]), env(&[(ENV_API_TIMEOUT_SECS, "soon")])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn uploads_named_in_config_are_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,weather,temperature,humidity").unwrap();
        writeln!(file, "2024-01-15,cloudy,4.5,60").unwrap();
        writeln!(file, "2024-01-15 08:00:00,,,").unwrap();

        let mut config = dashboard_config_from_args(&args(&[]), env(&[])).unwrap();
        config.weather_csv = Some(file.path().to_path_buf());

        let mut dashboard = Dashboard::new(config.date.clone());
        let lines = load_uploads(&mut dashboard, &config).unwrap();
        assert_eq!(lines, vec!["weather: 1 of 2 row(s) uploaded, 1 without `weather`".to_string()]);
        assert!(dashboard.overrides().is_active(Category::Weather));
        assert!(!dashboard.overrides().is_active(Category::Traffic));
    }
}
