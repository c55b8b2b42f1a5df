//! Date filtering.
//!
//! Traffic and parking rows are matched by a textual prefix test on their
//! timestamp, weather rows by exact equality on their date. A timestamp that is
//! malformed but happens to share the prefix still matches; no date parsing
//! happens here.

use crate::domain::{DateRule, SurveyRecord};

/// Whether `record` belongs to `date`.
pub fn matches_date<T: SurveyRecord>(record: &T, date: &str) -> bool {
    match T::DATE_RULE {
        DateRule::TimestampPrefix => record.date_key().starts_with(date),
        DateRule::ExactDate => record.date_key() == date,
    }
}

/// Records matching `date`, in input order. `None` keeps everything.
pub fn filter_by_date<T: SurveyRecord>(records: &[T], date: Option<&str>) -> Vec<T> {
    match date {
        None => records.to_vec(),
        Some(date) => records
            .iter()
            .filter(|r| matches_date(*r, date))
            .cloned()
            .collect(),
    }
}
