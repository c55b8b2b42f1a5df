//! Exports: dashboard view JSON and synthetic-day CSV files.
//!
//! The CSV files use the same column names the ingest side expects, so a
//! generated day can be uploaded straight back as override data.

use std::collections::BTreeSet;
use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use crate::app::pipeline::DashboardView;
use crate::data::sample::SampleDay;
use crate::domain::TrafficRecord;
use crate::error::AppError;

/// Write a dashboard view as pretty JSON.
pub fn write_view_json(path: &Path, view: &DashboardView) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, view)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))?;
    Ok(())
}

/// Paths written by [`write_sample_csvs`].
#[derive(Debug, Clone)]
pub struct SampleFiles {
    pub traffic: PathBuf,
    pub parking: PathBuf,
    pub weather: PathBuf,
}

/// Write `traffic.csv`, `parking.csv` and `weather.csv` into `dir`.
pub fn write_sample_csvs(dir: &Path, day: &SampleDay) -> Result<SampleFiles, AppError> {
    create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))?;

    let files = SampleFiles {
        traffic: dir.join("traffic.csv"),
        parking: dir.join("parking.csv"),
        weather: dir.join("weather.csv"),
    };

    write_traffic_csv(&files.traffic, &day.traffic)?;
    write_serialized_csv(&files.parking, &day.parking)?;
    write_serialized_csv(&files.weather, &day.weather)?;

    Ok(files)
}

fn csv_writer(path: &Path) -> Result<csv::Writer<File>, AppError> {
    csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))
}

fn write_serialized_csv<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<(), AppError> {
    let mut writer = csv_writer(path)?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row to '{}': {e}", path.display())))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush '{}': {e}", path.display())))
}

// Traffic rows carry a free-form counter map, which `csv::Writer::serialize`
// cannot flatten; columns are laid out by hand.
fn write_traffic_csv(path: &Path, rows: &[TrafficRecord]) -> Result<(), AppError> {
    let counter_names: BTreeSet<&str> = rows
        .iter()
        .flat_map(|r| r.counters.keys().map(String::as_str))
        .collect();

    let mut writer = csv_writer(path)?;
    let write_err = |e: csv::Error| AppError::new(2, format!("Failed to write CSV row to '{}': {e}", path.display()));

    let mut header = vec!["timestamp", "vehicle_count"];
    header.extend(counter_names.iter().copied());
    writer.write_record(&header).map_err(write_err)?;

    for r in rows {
        let mut record = vec![r.timestamp.clone(), r.vehicle_count.to_string()];
        for name in &counter_names {
            let cell = match r.counters.get(*name) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(v) => v.to_string(),
                None => String::new(),
            };
            record.push(cell);
        }
        writer.write_record(&record).map_err(write_err)?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::generate_day;
    use crate::data::store::OverrideStore;
    use crate::domain::{Category, ParkingRecord, TrafficRecord, WeatherRecord};
    use crate::io::ingest::read_csv_rows;

    #[test]
    fn sample_csvs_upload_back_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let day = generate_day(date, 7).unwrap();
        let files = write_sample_csvs(dir.path(), &day).unwrap();

        let mut store = OverrideStore::new();
        for (category, path) in [
            (Category::Traffic, &files.traffic),
            (Category::Parking, &files.parking),
            (Category::Weather, &files.weather),
        ] {
            let csv = read_csv_rows(path).unwrap();
            let summary = store.upload(category, csv.rows);
            assert_eq!(summary.shape_mismatches, 0, "{category}");
        }

        assert_eq!(store.get_filtered::<TrafficRecord>(Some("2024-01-15")), day.traffic);
        assert_eq!(store.get_filtered::<ParkingRecord>(Some("2024-01-15")).len(), day.parking.len());
        assert_eq!(store.get_filtered::<WeatherRecord>(Some("2024-01-15")), day.weather);
    }
}
