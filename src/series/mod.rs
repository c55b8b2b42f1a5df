//! Chart-ready series derived from one category's (already date-filtered) records.
//!
//! Every derivation is a pure function of its input, preserves input order (or
//! first-seen key order for grouped output) and returns an empty series for an
//! empty input.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::domain::{ParkingRecord, TrafficRecord, WeatherRecord};

/// One point of the traffic line chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficPoint {
    /// Time of day (`HH:MM:SS`).
    pub time: String,
    pub vehicles: u32,
    /// Numeric per-class counters reported alongside `vehicle_count`.
    pub counters: BTreeMap<String, f64>,
}

/// One point of the parking flow chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParkingPoint {
    pub time: String,
    pub entry: u32,
    pub exit: u32,
    /// Percent (`occupancy_rate × 100`).
    pub occupancy: f64,
}

/// Count of records per plate region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionShare {
    pub name: String,
    pub value: usize,
}

/// Mean stay duration of the records whose timestamp falls in one hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyStay {
    /// `HH:00`
    pub hour: String,
    /// Minutes, rounded half-up.
    pub avg_duration: u32,
}

/// Time-of-day part of a `YYYY-MM-DD HH:MM:SS` timestamp.
///
/// This is the field after the first space; a timestamp without one yields "".
pub fn time_of_day(timestamp: &str) -> &str {
    timestamp.split(' ').nth(1).unwrap_or("")
}

/// Hour part of a timestamp's time of day (the text before the first `:`).
pub fn hour_of(timestamp: &str) -> &str {
    time_of_day(timestamp).split(':').next().unwrap_or("")
}

pub fn traffic_series(records: &[TrafficRecord]) -> Vec<TrafficPoint> {
    records
        .iter()
        .map(|r| TrafficPoint {
            time: time_of_day(&r.timestamp).to_string(),
            vehicles: r.vehicle_count,
            counters: r
                .counters
                .iter()
                .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
                .collect(),
        })
        .collect()
}

pub fn parking_series(records: &[ParkingRecord]) -> Vec<ParkingPoint> {
    records
        .iter()
        .map(|r| ParkingPoint {
            time: time_of_day(&r.timestamp).to_string(),
            entry: r.entry_count,
            exit: r.exit_count,
            occupancy: r.occupancy_rate * 100.0,
        })
        .collect()
}

/// Occurrences of each distinct `plate_region`, in first-seen order.
pub fn region_distribution(records: &[ParkingRecord]) -> Vec<RegionShare> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<RegionShare> = Vec::new();

    for r in records {
        match index.get(r.plate_region.as_str()) {
            Some(&i) => out[i].value += 1,
            None => {
                index.insert(&r.plate_region, out.len());
                out.push(RegionShare {
                    name: r.plate_region.clone(),
                    value: 1,
                });
            }
        }
    }

    out
}

/// Mean `stay_duration` per hour bucket, in first-seen hour order.
///
/// Only hours present in the input produce an entry.
pub fn hourly_stay(records: &[ParkingRecord]) -> Vec<HourlyStay> {
    // hour -> (total minutes, count)
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut buckets: Vec<(&str, u64, u64)> = Vec::new();

    for r in records {
        let hour = hour_of(&r.timestamp);
        match index.get(hour) {
            Some(&i) => {
                buckets[i].1 += u64::from(r.stay_duration);
                buckets[i].2 += 1;
            }
            None => {
                index.insert(hour, buckets.len());
                buckets.push((hour, u64::from(r.stay_duration), 1));
            }
        }
    }

    buckets
        .into_iter()
        .map(|(hour, total, count)| HourlyStay {
            hour: format!("{hour}:00"),
            avg_duration: round_half_up_div(total, count),
        })
        .collect()
}

/// The day's weather record: the first one whose date equals `date`.
pub fn weather_for_day<'a>(records: &'a [WeatherRecord], date: &str) -> Option<&'a WeatherRecord> {
    records.iter().find(|r| r.date == date)
}

/// `round(total / count)` with halves rounded up; `count` must be > 0.
fn round_half_up_div(total: u64, count: u64) -> u32 {
    let q = (2 * total + count) / (2 * count);
    u32::try_from(q).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WeatherCondition;

    fn parking(ts: &str, region: &str, stay: u32) -> ParkingRecord {
        ParkingRecord {
            timestamp: ts.to_string(),
            entry_count: 2,
            exit_count: 1,
            occupancy_rate: 0.45,
            plate_region: region.to_string(),
            stay_duration: stay,
        }
    }

    #[test]
    fn hourly_average_example() {
        let records = vec![
            parking("2024-01-15 09:00:00", "神戸", 30),
            parking("2024-01-15 09:30:00", "神戸", 50),
        ];
        assert_eq!(
            hourly_stay(&records),
            vec![HourlyStay {
                hour: "09:00".to_string(),
                avg_duration: 40
            }]
        );
    }

    #[test]
    fn hourly_average_rounds_half_up_and_skips_missing_hours() {
        let records = vec![
            parking("2024-01-15 10:05:00", "神戸", 10),
            parking("2024-01-15 08:10:00", "神戸", 1),
            parking("2024-01-15 10:45:00", "大阪", 11),
            parking("2024-01-15 08:50:00", "大阪", 2),
        ];
        let out = hourly_stay(&records);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].hour, "10:00");
        assert_eq!(out[0].avg_duration, 11); // 10.5
        assert_eq!(out[1].hour, "08:00");
        assert_eq!(out[1].avg_duration, 2); // 1.5
    }

    #[test]
    fn region_distribution_counts() {
        let records = vec![
            parking("2024-01-15 09:00:00", "神戸", 10),
            parking("2024-01-15 09:00:00", "神戸", 10),
            parking("2024-01-15 09:10:00", "大阪", 10),
        ];
        let out: HashMap<String, usize> = region_distribution(&records)
            .into_iter()
            .map(|s| (s.name, s.value))
            .collect();
        assert_eq!(out.len(), 2);
        assert_eq!(out["神戸"], 2);
        assert_eq!(out["大阪"], 1);
    }

    #[test]
    fn parking_series_rescales_occupancy() {
        let out = parking_series(&[parking("2024-01-15 09:00:00", "神戸", 10)]);
        assert_eq!(out[0].time, "09:00:00");
        assert!((out[0].occupancy - 45.0).abs() < 1e-9);
        assert_eq!((out[0].entry, out[0].exit), (2, 1));
    }

    #[test]
    fn traffic_series_preserves_order_and_numeric_counters() {
        let mut late = TrafficRecord {
            timestamp: "2024-01-15 18:00:00".to_string(),
            vehicle_count: 40,
            counters: Default::default(),
        };
        late.counters.insert("large_vehicle_count".to_string(), serde_json::json!(4));
        late.counters.insert("direction".to_string(), serde_json::json!("up"));
        let early = TrafficRecord {
            timestamp: "2024-01-15 07:00:00".to_string(),
            vehicle_count: 10,
            counters: Default::default(),
        };

        let out = traffic_series(&[late, early]);
        assert_eq!(out[0].time, "18:00:00");
        assert_eq!(out[1].time, "07:00:00");
        assert_eq!(out[0].counters.len(), 1);
        assert_eq!(out[0].counters["large_vehicle_count"], 4.0);
    }

    #[test]
    fn empty_input_yields_empty_series() {
        assert!(traffic_series(&[]).is_empty());
        assert!(parking_series(&[]).is_empty());
        assert!(region_distribution(&[]).is_empty());
        assert!(hourly_stay(&[]).is_empty());
    }

    #[test]
    fn timestamp_without_time_has_empty_time_of_day() {
        assert_eq!(time_of_day("2024-01-15"), "");
        assert_eq!(hour_of("2024-01-15"), "");
        assert_eq!(hour_of("2024-01-15 07:15:00"), "07");
    }

    #[test]
    fn weather_first_match_wins() {
        let records = vec![
            WeatherRecord {
                date: "2024-01-15".to_string(),
                weather: WeatherCondition::Sunny,
                temperature: 6.0,
                humidity: 30,
            },
            WeatherRecord {
                date: "2024-01-15".to_string(),
                weather: WeatherCondition::Rainy,
                temperature: 4.0,
                humidity: 90,
            },
        ];
        let day = weather_for_day(&records, "2024-01-15").unwrap();
        assert_eq!(day.weather, WeatherCondition::Sunny);
        assert!(weather_for_day(&records, "2024-01-16").is_none());
    }
}
