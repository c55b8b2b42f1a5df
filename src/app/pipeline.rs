//! Shared dashboard state used by both the `show` command and the TUI.
//!
//! [`Dashboard`] ties the override store to one [`CategoryFeed`] per category.
//! Mutations only record new inputs; [`Dashboard::resolve`] compares them with
//! the last resolution and hands out [`Ticket`]s for the remote lookups it
//! needs. The front-ends only decide where those lookups run: inline
//! ([`Dashboard::resolve_blocking`]) or on worker threads that report back
//! through [`Dashboard::commit`].

use serde::Serialize;
use serde_json::Value;

use crate::data::remote::{RecordSource, decode_rows};
use crate::data::resolver::{CategoryFeed, FetchState, Resolution, Ticket};
use crate::data::store::{OverrideSlot, OverrideStore, UploadSummary};
use crate::domain::{Category, ParkingRecord, SurveyRecord, TrafficRecord, WeatherRecord};
use crate::error::FetchError;
use crate::series::{
    HourlyStay, ParkingPoint, RegionShare, TrafficPoint, hourly_stay, parking_series, region_distribution,
    traffic_series, weather_for_day,
};

/// Where a category's current data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Upload,
    Remote,
}

/// Render status of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStatus {
    pub category: Category,
    pub source: DataSource,
    pub loading: bool,
    pub error: Option<String>,
    /// Records currently held for the selected date.
    pub records: usize,
    /// User-facing line for an error or an empty result.
    pub notice: Option<String>,
}

impl CategoryStatus {
    fn from_state<T>(category: Category, source: DataSource, state: &FetchState<T>) -> Self {
        let notice = match (&state.error, state.loading, state.data.is_empty()) {
            (Some(err), _, _) => Some(format!("Failed to load {category} data: {err}")),
            (None, false, true) => Some(format!("No {category} data for the selected date")),
            _ => None,
        };
        Self {
            category,
            source,
            loading: state.loading,
            error: state.error.clone(),
            records: state.data.len(),
            notice,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficView {
    pub status: CategoryStatus,
    pub series: Vec<TrafficPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParkingView {
    pub status: CategoryStatus,
    pub series: Vec<ParkingPoint>,
    pub regions: Vec<RegionShare>,
    pub hourly_stay: Vec<HourlyStay>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherView {
    pub status: CategoryStatus,
    pub day: Option<WeatherRecord>,
}

/// Chart-ready snapshot of the whole dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    /// `None` when every date is selected.
    pub date: Option<String>,
    pub traffic: TrafficView,
    pub parking: ParkingView,
    pub weather: WeatherView,
}

impl DashboardView {
    pub fn statuses(&self) -> [&CategoryStatus; 3] {
        [&self.traffic.status, &self.parking.status, &self.weather.status]
    }

    pub fn is_loading(&self) -> bool {
        self.statuses().iter().any(|s| s.loading)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    overrides: OverrideStore,
    traffic: CategoryFeed<TrafficRecord>,
    parking: CategoryFeed<ParkingRecord>,
    weather: CategoryFeed<WeatherRecord>,
    date: Option<String>,
}

impl Dashboard {
    pub fn new(date: Option<String>) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn overrides(&self) -> &OverrideStore {
        &self.overrides
    }

    /// Select a date (`None` for all dates). Takes effect on the next resolve.
    pub fn set_date(&mut self, date: Option<String>) {
        self.date = date;
    }

    /// Replace `category`'s override with `rows`. Takes effect on the next resolve.
    pub fn upload(&mut self, category: Category, rows: Vec<Value>) -> UploadSummary {
        self.overrides.upload(category, rows)
    }

    /// Drop `category`'s override so it falls back to the remote source on the next resolve.
    pub fn clear(&mut self, category: Category) {
        self.overrides.clear(category);
    }

    /// Re-run every category, including remote lookups whose inputs did not change.
    pub fn refresh(&mut self) -> Vec<Ticket> {
        self.traffic.invalidate();
        self.parking.invalidate();
        self.weather.invalidate();
        self.resolve()
    }

    /// Resolve every category whose inputs changed; returns the lookups to run.
    pub fn resolve(&mut self) -> Vec<Ticket> {
        let date = self.date.as_deref();
        let mut tickets = Vec::new();
        tickets.extend(pending(resolve_feed(&mut self.traffic, date, &self.overrides)));
        tickets.extend(pending(resolve_feed(&mut self.parking, date, &self.overrides)));
        tickets.extend(pending(resolve_feed(&mut self.weather, date, &self.overrides)));
        tickets
    }

    /// Apply a finished lookup. Returns `false` if it was superseded.
    pub fn commit(&mut self, ticket: &Ticket, result: Result<Vec<Value>, FetchError>) -> bool {
        match ticket.category {
            Category::Traffic => commit_feed(&mut self.traffic, ticket, result),
            Category::Parking => commit_feed(&mut self.parking, ticket, result),
            Category::Weather => commit_feed(&mut self.weather, ticket, result),
        }
    }

    /// Resolve and run the resulting lookups inline against `source`.
    pub fn resolve_blocking(&mut self, source: &dyn RecordSource) {
        for ticket in self.resolve() {
            let result = source.fetch(ticket.category, ticket.date.as_deref());
            self.commit(&ticket, result);
        }
    }

    pub fn view(&self) -> DashboardView {
        let traffic = self.traffic.state();
        let parking = self.parking.state();
        let weather = self.weather.state();

        // Weather is one record per day; with all dates selected, the first one stands in.
        let day = match self.date.as_deref() {
            Some(date) => weather_for_day(&weather.data, date),
            None => weather.data.first(),
        };

        DashboardView {
            date: self.date.clone(),
            traffic: TrafficView {
                status: self.status(traffic),
                series: traffic_series(&traffic.data),
            },
            parking: ParkingView {
                status: self.status(parking),
                series: parking_series(&parking.data),
                regions: region_distribution(&parking.data),
                hourly_stay: hourly_stay(&parking.data),
            },
            weather: WeatherView {
                status: self.status(weather),
                day: day.cloned(),
            },
        }
    }

    fn status<T: SurveyRecord>(&self, state: &FetchState<T>) -> CategoryStatus {
        let source = if self.overrides.is_active(T::CATEGORY) {
            DataSource::Upload
        } else {
            DataSource::Remote
        };
        CategoryStatus::from_state(T::CATEGORY, source, state)
    }
}

fn resolve_feed<T: OverrideSlot>(
    feed: &mut CategoryFeed<T>,
    date: Option<&str>,
    overrides: &OverrideStore,
) -> Resolution {
    feed.resolve(date, overrides.slot::<T>())
}

fn pending(resolution: Resolution) -> Option<Ticket> {
    match resolution {
        Resolution::Pending(ticket) => Some(ticket),
        Resolution::Unchanged | Resolution::Ready => None,
    }
}

fn commit_feed<T: SurveyRecord>(
    feed: &mut CategoryFeed<T>,
    ticket: &Ticket,
    result: Result<Vec<Value>, FetchError>,
) -> bool {
    feed.commit(ticket, result.map(decode_rows::<T>))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use serde_json::json;

    /// In-memory source that records every request.
    #[derive(Default)]
    struct FakeSource {
        rows: HashMap<Category, Vec<Value>>,
        failing: Vec<Category>,
        calls: Mutex<Vec<(Category, Option<String>)>>,
    }

    impl FakeSource {
        fn with(mut self, category: Category, rows: Vec<Value>) -> Self {
            self.rows.insert(category, rows);
            self
        }

        fn calls(&self) -> Vec<(Category, Option<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RecordSource for FakeSource {
        fn fetch(&self, category: Category, date: Option<&str>) -> Result<Vec<Value>, FetchError> {
            self.calls.lock().unwrap().push((category, date.map(str::to_string)));
            if self.failing.contains(&category) {
                return Err(FetchError::FetchFailed {
                    category,
                    reason: "status 500 Internal Server Error".to_string(),
                });
            }
            let rows = self.rows.get(&category).cloned().unwrap_or_default();
            // The server filters by date.
            Ok(rows
                .into_iter()
                .filter(|r| {
                    let key = r.get("timestamp").or_else(|| r.get("date")).and_then(Value::as_str);
                    match (date, key) {
                        (Some(d), Some(k)) => k.starts_with(d),
                        _ => true,
                    }
                })
                .collect())
        }
    }

    fn remote_source() -> FakeSource {
        FakeSource::default()
            .with(
                Category::Traffic,
                vec![
                    json!({"timestamp": "2024-01-15 08:00:00", "vehicle_count": 10}),
                    json!({"timestamp": "2024-01-16 08:00:00", "vehicle_count": 20}),
                ],
            )
            .with(
                Category::Parking,
                vec![
                    json!({"timestamp": "2024-01-15 09:00:00", "entry_count": 3, "exit_count": 1,
                           "occupancy_rate": 0.5, "plate_region": "神戸", "stay_duration": 30}),
                    json!({"timestamp": "2024-01-15 09:30:00", "entry_count": 1, "exit_count": 0,
                           "occupancy_rate": 0.55, "plate_region": "大阪", "stay_duration": 50}),
                ],
            )
            .with(
                Category::Weather,
                vec![json!({"date": "2024-01-15", "weather": "sunny", "temperature": 8.5, "humidity": 40})],
            )
    }

    #[test]
    fn remote_categories_resolve_independently() {
        let source = remote_source();
        let mut dash = Dashboard::new(Some("2024-01-15".to_string()));
        dash.resolve_blocking(&source);

        let view = dash.view();
        assert!(!view.is_loading());
        assert_eq!(view.traffic.series.len(), 1);
        assert_eq!(view.traffic.series[0].vehicles, 10);
        assert_eq!(view.parking.hourly_stay[0].avg_duration, 40);
        assert_eq!(view.parking.regions.len(), 2);
        assert_eq!(view.weather.day.as_ref().map(|w| w.temperature), Some(8.5));
        assert_eq!(source.calls().len(), 3);
        assert!(view.statuses().iter().all(|s| s.source == DataSource::Remote));
    }

    #[test]
    fn upload_takes_precedence_and_clear_falls_back() {
        let source = remote_source();
        let mut dash = Dashboard::new(Some("2024-01-15".to_string()));
        dash.resolve_blocking(&source);

        let summary = dash.upload(
            Category::Traffic,
            vec![
                json!({"timestamp": "2024-01-15 07:00:00", "vehicle_count": 99}),
                json!({"timestamp": "2024-01-15 07:00:00", "entry_count": 1}),
            ],
        );
        assert!(dash.resolve().is_empty());
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.shape_mismatches, 1);

        let view = dash.view();
        assert_eq!(view.traffic.status.source, DataSource::Upload);
        assert_eq!(view.traffic.series[0].vehicles, 99);
        assert_eq!(view.parking.status.source, DataSource::Remote);

        dash.clear(Category::Traffic);
        let tickets = dash.resolve();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].category, Category::Traffic);
        assert!(dash.view().traffic.status.loading);
    }

    #[test]
    fn upload_with_nothing_for_the_date_shows_empty_notice() {
        let mut dash = Dashboard::new(Some("2024-01-20".to_string()));
        dash.upload(Category::Weather, vec![json!({"date": "2024-01-15", "weather": "rainy", "temperature": 2, "humidity": 90})]);
        dash.resolve();

        let view = dash.view();
        assert!(view.weather.day.is_none());
        assert!(!view.weather.status.loading);
        assert_eq!(
            view.weather.status.notice.as_deref(),
            Some("No weather data for the selected date")
        );
    }

    #[test]
    fn failure_is_reported_per_category() {
        let mut source = remote_source();
        source.failing.push(Category::Parking);
        let mut dash = Dashboard::new(Some("2024-01-15".to_string()));
        dash.resolve_blocking(&source);

        let view = dash.view();
        let notice = view.parking.status.notice.as_deref().unwrap();
        assert_eq!(notice, "Failed to load parking data: status 500 Internal Server Error");
        assert_eq!(notice.matches("parking").count(), 1);
        assert!(view.traffic.status.error.is_none());
        assert_eq!(view.traffic.series.len(), 1);
    }

    #[test]
    fn uploaded_rows_with_blank_or_numeric_cells_reach_the_view() {
        let csv = "timestamp,entry_count,exit_count,occupancy_rate,plate_region,stay_duration\n\
                   2024-01-15 09:00:00,3,1,0.5,神戸,30\n\
                   2024-01-15 09:30:00,2,,0.55,大阪,50\n\
                   2024-01-15 10:00:00,2,0,0.55,500,10\n";
        let rows = crate::io::ingest::read_csv_from(csv.as_bytes()).unwrap().rows;

        let mut dash = Dashboard::new(Some("2024-01-15".to_string()));
        let summary = dash.upload(Category::Parking, rows);
        assert_eq!(summary.accepted, 3);
        dash.resolve();

        let view = dash.view();
        let regions: Vec<(&str, usize)> = view
            .parking
            .regions
            .iter()
            .map(|r| (r.name.as_str(), r.value))
            .collect();
        assert_eq!(regions, vec![("神戸", 1), ("大阪", 1), ("500", 1)]);
        assert_eq!(view.parking.series.len(), 3);
    }

    #[test]
    fn only_changed_inputs_trigger_lookups() {
        let source = remote_source();
        let mut dash = Dashboard::new(Some("2024-01-15".to_string()));
        dash.resolve_blocking(&source);
        dash.resolve_blocking(&source);
        assert_eq!(source.calls().len(), 3);

        dash.set_date(Some("2024-01-16".to_string()));
        dash.resolve()
            .into_iter()
            .for_each(|t| {
                let r = source.fetch(t.category, t.date.as_deref());
                dash.commit(&t, r);
            });
        assert_eq!(source.calls().len(), 6);
        assert_eq!(dash.view().traffic.series[0].vehicles, 20);

        let tickets = dash.refresh();
        assert_eq!(tickets.len(), 3);
    }

    #[test]
    fn superseded_lookup_does_not_overwrite_latest() {
        let source = remote_source();
        let mut dash = Dashboard::new(Some("2024-01-15".to_string()));
        let first = dash.resolve();
        dash.set_date(Some("2024-01-16".to_string()));
        let second = dash.resolve();

        for t in &second {
            let r = source.fetch(t.category, t.date.as_deref());
            assert!(dash.commit(t, r));
        }
        for t in &first {
            let r = source.fetch(t.category, t.date.as_deref());
            assert!(!dash.commit(t, r));
        }

        let view = dash.view();
        assert_eq!(view.traffic.series.len(), 1);
        assert_eq!(view.traffic.series[0].vehicles, 20);
        assert!(view.weather.day.is_none());
    }

    #[test]
    fn all_dates_requests_unscoped_data() {
        let source = remote_source();
        let mut dash = Dashboard::new(None);
        dash.resolve_blocking(&source);

        assert!(source.calls().iter().all(|(_, date)| date.is_none()));
        let view = dash.view();
        assert_eq!(view.traffic.series.len(), 2);
        assert_eq!(view.weather.day.as_ref().map(|w| w.date.as_str()), Some("2024-01-15"));
    }

    #[test]
    fn view_serializes_with_lowercase_categories() {
        let mut dash = Dashboard::new(Some("2024-01-15".to_string()));
        dash.upload(Category::Traffic, vec![]);
        dash.resolve();
        let json = serde_json::to_value(dash.view()).unwrap();
        assert_eq!(json["traffic"]["status"]["category"], "traffic");
        assert_eq!(json["traffic"]["status"]["source"], "upload");
        assert_eq!(json["date"], "2024-01-15");
    }
}
