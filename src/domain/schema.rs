//! Structural classification of untyped rows.
//!
//! Rows reach the dashboard as untyped JSON objects, either from the remote API
//! or from an uploaded CSV file. A row belongs to a category iff it carries that
//! category's distinguishing field (see [`Category::marker_field`]). Rows that
//! don't are excluded from the category's view; that is a filter, not an error.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::{Category, ParkingRecord, TrafficRecord, WeatherRecord};

/// How a record is matched against a selected date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRule {
    /// The record's timestamp starts with the date string (textual prefix).
    TimestampPrefix,
    /// The record's date equals the date string.
    ExactDate,
}

/// A record type belonging to exactly one [`Category`].
pub trait SurveyRecord: Clone + Serialize + DeserializeOwned + Send + 'static {
    const CATEGORY: Category;
    const DATE_RULE: DateRule;

    /// The field the date filter looks at (`timestamp` or `date`).
    fn date_key(&self) -> &str;
}

impl SurveyRecord for TrafficRecord {
    const CATEGORY: Category = Category::Traffic;
    const DATE_RULE: DateRule = DateRule::TimestampPrefix;

    fn date_key(&self) -> &str {
        &self.timestamp
    }
}

impl SurveyRecord for ParkingRecord {
    const CATEGORY: Category = Category::Parking;
    const DATE_RULE: DateRule = DateRule::TimestampPrefix;

    fn date_key(&self) -> &str {
        &self.timestamp
    }
}

impl SurveyRecord for WeatherRecord {
    const CATEGORY: Category = Category::Weather;
    const DATE_RULE: DateRule = DateRule::ExactDate;

    fn date_key(&self) -> &str {
        &self.date
    }
}

/// Result of splitting untyped rows into one category's records.
#[derive(Debug, Clone)]
pub struct Partitioned<T> {
    /// Accepted records, in input order.
    pub records: Vec<T>,
    /// Rows lacking the category's distinguishing field.
    pub shape_mismatches: usize,
}

/// Whether `row` exhibits `category`'s distinguishing field.
pub fn has_shape(category: Category, row: &Value) -> bool {
    row.as_object()
        .is_some_and(|obj| obj.contains_key(category.marker_field()))
}

/// First category whose distinguishing field `row` carries.
pub fn classify(row: &Value) -> Option<Category> {
    Category::ALL.into_iter().find(|c| has_shape(*c, row))
}

/// Split untyped rows into `T` records and a count of shape mismatches.
///
/// Shape is the only check: record fields decode leniently, so every row
/// carrying the distinguishing field is kept.
pub fn partition<T: SurveyRecord>(rows: Vec<Value>) -> Partitioned<T> {
    let mut records = Vec::with_capacity(rows.len());
    let mut shape_mismatches = 0usize;

    for (index, row) in rows.into_iter().enumerate() {
        if !has_shape(T::CATEGORY, &row) {
            shape_mismatches += 1;
            continue;
        }
        // Only reachable for a non-object row, which has_shape already rejects.
        match serde_json::from_value::<T>(row) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("{}: row {} not decoded: {e}", T::CATEGORY, index + 1),
        }
    }

    if shape_mismatches > 0 {
        log::debug!(
            "{}: excluded {shape_mismatches} row(s) without `{}`",
            T::CATEGORY,
            T::CATEGORY.marker_field()
        );
    }

    Partitioned {
        records,
        shape_mismatches,
    }
}
