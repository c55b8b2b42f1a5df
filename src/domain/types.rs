//! Shared domain types.
//!
//! Records are kept close to their wire shape (the same field names the
//! survey API and the uploaded CSV files use) so they can be:
//!
//! - decoded straight from JSON rows
//! - re-serialized for exports
//! - compared textually by the date filter (timestamps stay strings)

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One independent data pipeline of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Traffic,
    Parking,
    Weather,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Traffic, Category::Parking, Category::Weather];

    /// Path segment under the API base (`/api/<segment>`), also used in messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Traffic => "traffic",
            Category::Parking => "parking",
            Category::Weather => "weather",
        }
    }

    /// Field whose presence identifies a row as belonging to this category.
    pub fn marker_field(self) -> &'static str {
        match self {
            Category::Traffic => "vehicle_count",
            Category::Parking => "plate_region",
            Category::Weather => "weather",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A traffic counter reading.
///
/// Besides `vehicle_count`, field devices report a varying set of per-class
/// counters (e.g. `large_vehicle_count`); those are kept verbatim in `counters`.
///
/// Every field decodes leniently: a row that carries the distinguishing field
/// always becomes a record (missing or malformed values fall back to zero or
/// empty text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficRecord {
    /// `YYYY-MM-DD HH:MM:SS`
    #[serde(default, deserialize_with = "de_text")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "de_u32")]
    pub vehicle_count: u32,
    #[serde(flatten)]
    pub counters: BTreeMap<String, serde_json::Value>,
}

/// A parking gate reading. Several vehicles may share one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingRecord {
    /// `YYYY-MM-DD HH:MM:SS`
    #[serde(default, deserialize_with = "de_text")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "de_u32")]
    pub entry_count: u32,
    #[serde(default, deserialize_with = "de_u32")]
    pub exit_count: u32,
    /// Fraction in `[0, 1]`.
    #[serde(default, deserialize_with = "de_f64")]
    pub occupancy_rate: f64,
    /// Licence plate issuing region (e.g. `神戸`).
    #[serde(default, deserialize_with = "de_text")]
    pub plate_region: String,
    /// Minutes.
    #[serde(default, deserialize_with = "de_u32")]
    pub stay_duration: u32,
}

/// Daily weather observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// `YYYY-MM-DD`
    #[serde(default, deserialize_with = "de_text")]
    pub date: String,
    #[serde(deserialize_with = "de_condition")]
    pub weather: WeatherCondition,
    /// °C
    #[serde(default, deserialize_with = "de_f64")]
    pub temperature: f64,
    /// Percent, `0..=100`.
    #[serde(default, deserialize_with = "de_u8")]
    pub humidity: u8,
}

/// Sky condition of a [`WeatherRecord`].
///
/// Unknown labels are preserved rather than rejected, so a new condition
/// reported by a device still shows up (with its raw label).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeatherCondition {
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
    Other(String),
}

impl WeatherCondition {
    pub fn as_str(&self) -> &str {
        match self {
            WeatherCondition::Sunny => "sunny",
            WeatherCondition::Cloudy => "cloudy",
            WeatherCondition::Rainy => "rainy",
            WeatherCondition::Snowy => "snowy",
            WeatherCondition::Other(raw) => raw,
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(&self) -> &str {
        match self {
            WeatherCondition::Sunny => "Sunny",
            WeatherCondition::Cloudy => "Cloudy",
            WeatherCondition::Rainy => "Rain",
            WeatherCondition::Snowy => "Snow",
            WeatherCondition::Other(raw) => raw,
        }
    }
}

impl From<String> for WeatherCondition {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "sunny" => WeatherCondition::Sunny,
            "cloudy" => WeatherCondition::Cloudy,
            "rainy" => WeatherCondition::Rainy,
            "snowy" => WeatherCondition::Snowy,
            _ => WeatherCondition::Other(value),
        }
    }
}

impl From<WeatherCondition> for String {
    fn from(value: WeatherCondition) -> Self {
        value.as_str().to_string()
    }
}

// Uploaded cells are typed by content, so `500` may be a plate region and a
// blank cell is simply absent. These accept whatever JSON the row carries.

fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn de_condition<'de, D>(deserializer: D) -> Result<WeatherCondition, D::Error>
where
    D: Deserializer<'de>,
{
    de_text(deserializer).map(WeatherCondition::from)
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn de_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number_of(&Value::deserialize(deserializer)?).unwrap_or(0.0))
}

fn de_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let n = number_of(&Value::deserialize(deserializer)?).unwrap_or(0.0);
    Ok(n.round().clamp(0.0, f64::from(u32::MAX)) as u32)
}

fn de_u8<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let n = number_of(&Value::deserialize(deserializer)?).unwrap_or(0.0);
    Ok(n.round().clamp(0.0, f64::from(u8::MAX)) as u8)
}

/// Default date selected at startup.
pub const DEFAULT_DATE: &str = "2024-01-15";

/// Default remote API base.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";

/// A full session's configuration as understood by the dashboard.
///
/// This is derived from CLI flags, `.env` and defaults.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub api_base_url: String,
    /// `None` means no request timeout.
    pub timeout: Option<Duration>,
    /// `None` selects every date (filters become the identity).
    pub date: Option<String>,
    pub traffic_csv: Option<PathBuf>,
    pub parking_csv: Option<PathBuf>,
    pub weather_csv: Option<PathBuf>,
    pub export: Option<PathBuf>,
}

impl DashboardConfig {
    pub fn csv_path(&self, category: Category) -> Option<&PathBuf> {
        match category {
            Category::Traffic => self.traffic_csv.as_ref(),
            Category::Parking => self.parking_csv.as_ref(),
            Category::Weather => self.weather_csv.as_ref(),
        }
    }
}
