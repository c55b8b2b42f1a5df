//! Formatted terminal output for a [`DashboardView`].
//!
//! We keep formatting code in one place so:
//! - the data and series code stays free of presentation
//! - output changes are localized (important for future snapshot tests)

use crate::app::pipeline::{CategoryStatus, DashboardView, DataSource};
use crate::domain::WeatherRecord;
use crate::series::{HourlyStay, ParkingPoint, RegionShare, TrafficPoint};

/// Widest bar in the hourly stay chart.
const BAR_WIDTH: usize = 40;

/// Format the whole dashboard: header, weather, then one section per chart.
pub fn format_dashboard(view: &DashboardView) -> String {
    let mut out = String::new();

    out.push_str("=== survey - Traffic survey dashboard ===\n");
    out.push_str(&format!("Date: {}\n", view.date.as_deref().unwrap_or("all dates")));
    out.push_str(&format_weather_line(&view.weather.status, view.weather.day.as_ref()));
    out.push('\n');

    out.push_str("\nTraffic:\n");
    out.push_str(&format_status(&view.traffic.status));
    if !view.traffic.series.is_empty() {
        out.push_str(&format_traffic_table(&view.traffic.series));
    }

    out.push_str("\nParking:\n");
    out.push_str(&format_status(&view.parking.status));
    if !view.parking.series.is_empty() {
        out.push_str(&format_parking_table(&view.parking.series));
        out.push_str("\nPlate regions:\n");
        out.push_str(&format_regions(&view.parking.regions));
        out.push_str("\nAverage stay by hour (min):\n");
        out.push_str(&format_hourly_stay(&view.parking.hourly_stay, BAR_WIDTH));
    }

    out
}

/// `Weather: Sunny | 8.5°C | humidity 40%`, or the category's notice.
pub fn format_weather_line(status: &CategoryStatus, day: Option<&WeatherRecord>) -> String {
    if let Some(notice) = status.notice.as_deref().filter(|_| status.error.is_some()) {
        return format!("Weather: {notice}");
    }
    match day {
        Some(w) => format!(
            "Weather: {} | {:.1}°C | humidity {}%",
            w.weather.display_name(),
            w.temperature,
            w.humidity
        ),
        None if status.loading => "Weather: loading...".to_string(),
        None => format!("Weather: {}", status.notice.as_deref().unwrap_or("-")),
    }
}

fn format_status(status: &CategoryStatus) -> String {
    let source = match status.source {
        DataSource::Upload => "uploaded CSV",
        DataSource::Remote => "survey API",
    };
    let mut out = format!("source: {source} | records: {}\n", status.records);
    if status.loading {
        out.push_str("loading...\n");
    }
    if let Some(notice) = &status.notice {
        out.push_str(notice);
        out.push('\n');
    }
    out
}

fn format_traffic_table(series: &[TrafficPoint]) -> String {
    // Counter columns are the union across points, in name order.
    let mut counters: Vec<&str> = series
        .iter()
        .flat_map(|p| p.counters.keys().map(String::as_str))
        .collect();
    counters.sort_unstable();
    counters.dedup();

    let mut out = String::new();
    let mut header = format!("{:<10} {:>9}", "time", "vehicles");
    let mut rule = format!("{:-<10} {:-<9}", "", "");
    for name in &counters {
        let label = truncate(name, 20);
        let w = label.chars().count().max(8);
        header.push_str(&format!(" {label:>w$}"));
        rule.push_str(&format!(" {:-<w$}", ""));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');

    for p in series {
        let mut line = format!("{:<10} {:>9}", p.time, p.vehicles);
        for name in &counters {
            let w = truncate(name, 20).chars().count().max(8);
            let cell = p.counters.get(*name).map(|v| fmt_count(*v)).unwrap_or_default();
            line.push_str(&format!(" {cell:>w$}"));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

fn format_parking_table(series: &[ParkingPoint]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<10} {:>6} {:>6} {:>10}\n", "time", "entry", "exit", "occupancy"));
    out.push_str(&format!("{:-<10} {:-<6} {:-<6} {:-<10}\n", "", "", "", ""));
    for p in series {
        out.push_str(&format!(
            "{:<10} {:>6} {:>6} {:>9.1}%\n",
            p.time, p.entry, p.exit, p.occupancy
        ));
    }
    out
}

/// One `name count (share%)` line per plate region.
pub fn format_regions(regions: &[RegionShare]) -> String {
    let total: usize = regions.iter().map(|r| r.value).sum();
    let mut out = String::new();
    for r in regions {
        let pct = if total == 0 { 0.0 } else { r.value as f64 * 100.0 / total as f64 };
        out.push_str(&format!("  {:<12} {:>4} ({pct:>5.1}%)\n", truncate(&r.name, 12), r.value));
    }
    out
}

/// One `HH:00 minutes ####` line per hour, bars scaled to at most `width`.
pub fn format_hourly_stay(hours: &[HourlyStay], width: usize) -> String {
    let max = hours.iter().map(|h| h.avg_duration).max().unwrap_or(0);
    let mut out = String::new();
    for h in hours {
        out.push_str(&format!(
            "  {} {:>4} {}\n",
            h.hour,
            h.avg_duration,
            bar(h.avg_duration, max, width)
        ));
    }
    out
}

/// `value` scaled against `max` as a run of `#`, at least one for non-zero values.
fn bar(value: u32, max: u32, width: usize) -> String {
    if max == 0 || value == 0 {
        return String::new();
    }
    let n = ((f64::from(value) / f64::from(max)) * width as f64).round() as usize;
    "#".repeat(n.clamp(1, width))
}

fn fmt_count(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
