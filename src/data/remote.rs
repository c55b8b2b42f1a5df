//! Survey API integration (`GET <base>/<category>[?date=YYYY-MM-DD]`).

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use crate::domain::{Category, DashboardConfig, SurveyRecord, partition};
use crate::error::{AppError, FetchError};

/// Something that can produce the raw rows of a category.
///
/// The remote API is the production implementation; tests use in-memory fakes.
pub trait RecordSource: Send + Sync {
    /// Fetch `category`'s rows, scoped to `date` when given.
    fn fetch(&self, category: Category, date: Option<&str>) -> Result<Vec<Value>, FetchError>;
}

pub struct RemoteClient {
    client: Client,
    base_url: String,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, AppError> {
        // `None` also lifts the blocking client's built-in 30s default.
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self, AppError> {
        Self::new(config.api_base_url.clone(), config.timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, category: Category) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), category.as_str())
    }
}

impl RecordSource for RemoteClient {
    fn fetch(&self, category: Category, date: Option<&str>) -> Result<Vec<Value>, FetchError> {
        let mut req = self.client.get(self.endpoint(category));
        if let Some(date) = date {
            req = req.query(&[("date", date)]);
        }

        log::debug!("{category}: GET {} (date={date:?})", self.endpoint(category));

        let resp = req.send().map_err(|e| FetchError::FetchFailed {
            category,
            reason: format!("request failed: {e}"),
        })?;

        if !resp.status().is_success() {
            return Err(FetchError::FetchFailed {
                category,
                reason: format!("status {}", resp.status()),
            });
        }

        let body: Value = resp.json().map_err(|e| FetchError::ParseFailed {
            category,
            reason: format!("invalid JSON: {e}"),
        })?;

        match body {
            Value::Array(rows) => Ok(rows),
            other => Err(FetchError::ParseFailed {
                category,
                reason: format!("expected a JSON array, got {}", json_kind(&other)),
            }),
        }
    }
}

/// Decode fetched rows into `T`, dropping rows of other shapes.
pub fn decode_rows<T: SurveyRecord>(rows: Vec<Value>) -> Vec<T> {
    partition::<T>(rows).records
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use serde_json::json;

    use super::*;
    use crate::domain::{ParkingRecord, WeatherRecord};

    /// Serve exactly one HTTP response on a local port; returns the base URL.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            let request = String::from_utf8_lossy(&buf).to_string();
            request.lines().next().unwrap_or_default().to_string()
        });
        (format!("http://{addr}/api"), handle)
    }

    #[test]
    fn endpoint_joins_base_and_category() {
        let client = RemoteClient::new("http://localhost:3001/api/", None).unwrap();
        assert_eq!(client.endpoint(Category::Parking), "http://localhost:3001/api/parking");
    }

    #[test]
    fn fetch_sends_date_query_and_returns_rows() {
        let (base, server) = serve_once("200 OK", r#"[{"date":"2024-01-15","weather":"sunny","temperature":5.5,"humidity":40}]"#);
        let client = RemoteClient::new(base, None).unwrap();

        let rows = client.fetch(Category::Weather, Some("2024-01-15")).unwrap();
        assert_eq!(rows.len(), 1);

        let request_line = server.join().unwrap();
        assert!(request_line.starts_with("GET /api/weather?date=2024-01-15 "), "{request_line}");
    }

    #[test]
    fn fetch_without_date_requests_full_set() {
        let (base, server) = serve_once("200 OK", "[]");
        let client = RemoteClient::new(base, None).unwrap();

        let rows = client.fetch(Category::Traffic, None).unwrap();
        assert!(rows.is_empty());

        let request_line = server.join().unwrap();
        assert!(request_line.starts_with("GET /api/traffic "), "{request_line}");
    }

    #[test]
    fn non_success_status_is_fetch_failed() {
        let (base, server) = serve_once("500 Internal Server Error", "{}");
        let client = RemoteClient::new(base, None).unwrap();

        let err = client.fetch(Category::Parking, Some("2024-01-15")).unwrap_err();
        assert!(matches!(err, FetchError::FetchFailed { category: Category::Parking, .. }));
        server.join().unwrap();
    }

    #[test]
    fn non_array_body_is_parse_failed() {
        let (base, server) = serve_once("200 OK", r#"{"error":"nope"}"#);
        let client = RemoteClient::new(base, None).unwrap();

        let err = client.fetch(Category::Weather, None).unwrap_err();
        assert!(matches!(err, FetchError::ParseFailed { .. }));
        server.join().unwrap();
    }

    #[test]
    fn decode_rows_drops_other_shapes_only() {
        let rows = vec![
            json!({"timestamp": "2024-01-15 09:00:00", "entry_count": 1, "exit_count": 0,
                   "occupancy_rate": 0.25, "plate_region": "神戸", "stay_duration": 30}),
            json!({"timestamp": "2024-01-15 09:00:00", "vehicle_count": 4}),
        ];
        let parking = decode_rows::<ParkingRecord>(rows);
        assert_eq!(parking.len(), 1);

        let sparse = vec![json!({"date": "2024-01-15", "weather": "sunny"})];
        let weather = decode_rows::<WeatherRecord>(sparse);
        assert_eq!(weather.len(), 1);
        assert_eq!(weather[0].humidity, 0);
    }
}
