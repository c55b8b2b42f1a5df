//! Synthetic survey day generation.
//!
//! Produces a plausible day of traffic, parking and weather rows for a survey
//! date, deterministically from `(date, seed)`. Used to create upload-ready CSV
//! files when no field device data is at hand.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{Datelike, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{ParkingRecord, TrafficRecord, WeatherCondition, WeatherRecord};
use crate::error::AppError;

/// Plate regions seen at the survey car parks, with relative frequency.
const PLATE_REGIONS: [(&str, u32); 5] = [("神戸", 45), ("大阪", 25), ("姫路", 12), ("京都", 10), ("なにわ", 8)];

/// Car park capacity used to turn occupancy into a rate.
const PARKING_CAPACITY: f64 = 120.0;

/// Share of large vehicles in the traffic counts.
const LARGE_VEHICLE_SHARE: f64 = 0.12;

#[derive(Debug, Clone)]
pub struct SampleDay {
    pub traffic: Vec<TrafficRecord>,
    pub parking: Vec<ParkingRecord>,
    pub weather: Vec<WeatherRecord>,
}

pub fn generate_day(date: NaiveDate, seed: u64) -> Result<SampleDay, AppError> {
    let mut rng = StdRng::seed_from_u64(sample_seed(date, seed));
    let day = date.format("%Y-%m-%d").to_string();

    let weather = generate_weather(&mut rng, date, &day)?;
    // Bad weather keeps visitors away from the mountain.
    let demand = match weather.weather {
        WeatherCondition::Sunny => 1.0,
        WeatherCondition::Cloudy => 0.85,
        WeatherCondition::Rainy => 0.55,
        WeatherCondition::Snowy => 0.4,
        WeatherCondition::Other(_) => 0.8,
    };

    Ok(SampleDay {
        traffic: generate_traffic(&mut rng, &day, demand)?,
        parking: generate_parking(&mut rng, &day, demand)?,
        weather: vec![weather],
    })
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>, AppError> {
    Normal::new(mean, std_dev).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))
}

fn sample_seed(date: NaiveDate, seed: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    date.hash(&mut hasher);
    seed.hash(&mut hasher);
    hasher.finish()
}

/// Relative traffic level by hour: morning and late-afternoon peaks.
fn diurnal_profile(hour: u32) -> f64 {
    let h = f64::from(hour);
    let morning = (-(h - 10.0).powi(2) / 6.0).exp();
    let evening = 0.8 * (-(h - 16.0).powi(2) / 5.0).exp();
    0.15 + morning + evening
}

fn generate_traffic(rng: &mut StdRng, day: &str, demand: f64) -> Result<Vec<TrafficRecord>, AppError> {
    let noise = normal(0.0, 0.15)?;
    let mut out = Vec::new();

    for hour in 6..=20u32 {
        for minute in [0u32, 30] {
            let level = diurnal_profile(hour) * demand * (1.0 + noise.sample(rng));
            let vehicles = (level * 60.0).round().max(0.0) as u32;
            let large = (f64::from(vehicles) * LARGE_VEHICLE_SHARE).round() as u32;

            let mut record = TrafficRecord {
                timestamp: format!("{day} {hour:02}:{minute:02}:00"),
                vehicle_count: vehicles,
                counters: Default::default(),
            };
            record
                .counters
                .insert("large_vehicle_count".to_string(), large.into());
            record
                .counters
                .insert("small_vehicle_count".to_string(), (vehicles - large).into());
            out.push(record);
        }
    }

    Ok(out)
}

fn generate_parking(rng: &mut StdRng, day: &str, demand: f64) -> Result<Vec<ParkingRecord>, AppError> {
    let stay = normal(75.0, 30.0)?;
    let mut out = Vec::new();
    let mut parked = 0.0_f64;

    for hour in 8..=18u32 {
        let arrivals = ((diurnal_profile(hour) * demand * 3.0).round() as u32).max(1);
        let mut minutes: Vec<u32> = (0..arrivals).map(|_| rng.gen_range(0..60)).collect();
        minutes.sort_unstable();

        for minute in minutes {
            let entry_count = rng.gen_range(1..=3u32);
            let exit_count = if hour < 11 { rng.gen_range(0..=1u32) } else { rng.gen_range(0..=3u32) };
            parked = (parked + f64::from(entry_count) * 4.0 - f64::from(exit_count) * 3.0).clamp(0.0, PARKING_CAPACITY);

            let region = PLATE_REGIONS
                .choose_weighted(rng, |(_, w)| *w)
                .map(|(name, _)| *name)
                .unwrap_or(PLATE_REGIONS[0].0);

            out.push(ParkingRecord {
                timestamp: format!("{day} {hour:02}:{minute:02}:00"),
                entry_count,
                exit_count,
                occupancy_rate: (parked / PARKING_CAPACITY * 100.0).round() / 100.0,
                plate_region: region.to_string(),
                stay_duration: stay.sample(rng).round().max(5.0) as u32,
            });
        }
    }

    Ok(out)
}

fn generate_weather(rng: &mut StdRng, date: NaiveDate, day: &str) -> Result<WeatherRecord, AppError> {
    let winter = matches!(date.month(), 12 | 1 | 2);
    let base_temp = match date.month() {
        12 | 1 | 2 => 3.0,
        3 | 4 | 5 | 9 | 10 | 11 => 14.0,
        _ => 24.0,
    };

    let roll = rng.gen_range(0..100u32);
    let weather = match roll {
        0..=44 => WeatherCondition::Sunny,
        45..=74 => WeatherCondition::Cloudy,
        _ if winter => WeatherCondition::Snowy,
        _ => WeatherCondition::Rainy,
    };

    let temp = normal(base_temp, 3.0)?;
    let temperature = (temp.sample(rng) * 10.0).round() / 10.0;
    let humidity = match weather {
        WeatherCondition::Rainy | WeatherCondition::Snowy => rng.gen_range(75..=95u8),
        _ => rng.gen_range(35..=70u8),
    };

    Ok(WeatherRecord {
        date: day.to_string(),
        weather,
        temperature,
        humidity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn same_seed_same_day() {
        let a = generate_day(date(), 1).unwrap();
        let b = generate_day(date(), 1).unwrap();
        assert_eq!(a.traffic, b.traffic);
        assert_eq!(a.parking, b.parking);
        assert_eq!(a.weather, b.weather);
    }

    #[test]
    fn rows_belong_to_the_requested_date() {
        let day = generate_day(date(), 3).unwrap();
        assert!(day.traffic.iter().all(|r| r.timestamp.starts_with("2024-01-15 ")));
        assert!(day.parking.iter().all(|r| r.timestamp.starts_with("2024-01-15 ")));
        assert_eq!(day.weather.len(), 1);
        assert_eq!(day.weather[0].date, "2024-01-15");
    }

    #[test]
    fn values_stay_in_range() {
        let day = generate_day(date(), 11).unwrap();
        assert!(!day.parking.is_empty());
        for r in &day.parking {
            assert!((0.0..=1.0).contains(&r.occupancy_rate));
            assert!(r.stay_duration >= 5);
        }
        assert!(day.weather[0].humidity <= 100);
        // January: no rain, only snow for wet days.
        assert_ne!(day.weather[0].weather, WeatherCondition::Rainy);
    }

    #[test]
    fn parking_rows_are_chronological() {
        let day = generate_day(date(), 5).unwrap();
        let stamps: Vec<&str> = day.parking.iter().map(|r| r.timestamp.as_str()).collect();
        let mut sorted = stamps.clone();
        sorted.sort();
        assert_eq!(stamps, sorted);
    }
}
