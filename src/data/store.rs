//! Session-scoped store of user-uploaded override data.
//!
//! Each category has its own slot. An upload replaces the slot's records
//! wholesale and activates it; a clear empties and deactivates it. Slots never
//! merge and never affect one another. Nothing here is persisted.

use serde_json::Value;

use crate::data::filter::filter_by_date;
use crate::domain::{
    Category, ParkingRecord, SurveyRecord, TrafficRecord, WeatherRecord, classify, has_shape, partition,
};

/// Override state of one category.
///
/// Invariant: `active` iff an upload happened and was not cleared since;
/// `records` is empty whenever `active` is false.
#[derive(Debug, Clone)]
pub struct CategoryOverride<T> {
    active: bool,
    records: Vec<T>,
    /// Bumped on every change so consumers can tell a new upload from the old one.
    revision: u64,
}

impl<T> Default for CategoryOverride<T> {
    fn default() -> Self {
        Self {
            active: false,
            records: Vec::new(),
            revision: 0,
        }
    }
}

impl<T: SurveyRecord> CategoryOverride<T> {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Records matching `date` (all of them when `date` is `None`).
    pub fn filtered(&self, date: Option<&str>) -> Vec<T> {
        filter_by_date(&self.records, date)
    }

    fn replace(&mut self, records: Vec<T>) {
        self.records = records;
        self.active = true;
        self.revision += 1;
    }

    fn clear(&mut self) {
        if !self.active && self.records.is_empty() {
            return;
        }
        self.records.clear();
        self.active = false;
        self.revision += 1;
    }
}

/// Gives the store typed access to the slot holding `Self`.
pub trait OverrideSlot: SurveyRecord {
    fn slot(store: &OverrideStore) -> &CategoryOverride<Self>;
    fn slot_mut(store: &mut OverrideStore) -> &mut CategoryOverride<Self>;
}

impl OverrideSlot for TrafficRecord {
    fn slot(store: &OverrideStore) -> &CategoryOverride<Self> {
        &store.traffic
    }
    fn slot_mut(store: &mut OverrideStore) -> &mut CategoryOverride<Self> {
        &mut store.traffic
    }
}

impl OverrideSlot for ParkingRecord {
    fn slot(store: &OverrideStore) -> &CategoryOverride<Self> {
        &store.parking
    }
    fn slot_mut(store: &mut OverrideStore) -> &mut CategoryOverride<Self> {
        &mut store.parking
    }
}

impl OverrideSlot for WeatherRecord {
    fn slot(store: &OverrideStore) -> &CategoryOverride<Self> {
        &store.weather
    }
    fn slot_mut(store: &mut OverrideStore) -> &mut CategoryOverride<Self> {
        &mut store.weather
    }
}

/// What happened to the rows of one upload.
#[derive(Debug, Clone)]
pub struct UploadSummary {
    pub category: Category,
    pub rows: usize,
    pub accepted: usize,
    /// Rows without the category's distinguishing field.
    pub shape_mismatches: usize,
    /// Mismatched rows that carry another category's field, in first-seen order.
    pub other_shapes: Vec<(Category, usize)>,
}

/// Per-category override data for one session.
#[derive(Debug, Clone, Default)]
pub struct OverrideStore {
    traffic: CategoryOverride<TrafficRecord>,
    parking: CategoryOverride<ParkingRecord>,
    weather: CategoryOverride<WeatherRecord>,
}

impl OverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `category`'s records with the rows that have its shape.
    ///
    /// The slot is activated even if no row survives the shape filter.
    pub fn upload(&mut self, category: Category, rows: Vec<Value>) -> UploadSummary {
        let summary = match category {
            Category::Traffic => self.upload_rows::<TrafficRecord>(rows),
            Category::Parking => self.upload_rows::<ParkingRecord>(rows),
            Category::Weather => self.upload_rows::<WeatherRecord>(rows),
        };
        log::info!(
            "{category}: uploaded {} of {} row(s) ({} without `{}`)",
            summary.accepted,
            summary.rows,
            summary.shape_mismatches,
            category.marker_field()
        );
        for (other, n) in &summary.other_shapes {
            log::warn!("{category}: {n} uploaded row(s) look like {other} data");
        }
        summary
    }

    pub fn clear(&mut self, category: Category) {
        match category {
            Category::Traffic => self.traffic.clear(),
            Category::Parking => self.parking.clear(),
            Category::Weather => self.weather.clear(),
        }
        log::info!("{category}: override cleared");
    }

    pub fn is_active(&self, category: Category) -> bool {
        match category {
            Category::Traffic => self.traffic.is_active(),
            Category::Parking => self.parking.is_active(),
            Category::Weather => self.weather.is_active(),
        }
    }

    /// Number of stored records for `category`, regardless of date.
    pub fn len(&self, category: Category) -> usize {
        match category {
            Category::Traffic => self.traffic.len(),
            Category::Parking => self.parking.len(),
            Category::Weather => self.weather.len(),
        }
    }

    pub fn slot<T: OverrideSlot>(&self) -> &CategoryOverride<T> {
        T::slot(self)
    }

    /// `T`'s stored records matching `date` (all of them when `date` is `None`).
    pub fn get_filtered<T: OverrideSlot>(&self, date: Option<&str>) -> Vec<T> {
        T::slot(self).filtered(date)
    }

    fn upload_rows<T: OverrideSlot>(&mut self, rows: Vec<Value>) -> UploadSummary {
        let total = rows.len();
        let mut other_shapes: Vec<(Category, usize)> = Vec::new();
        for other in rows.iter().filter(|row| !has_shape(T::CATEGORY, row)).filter_map(classify) {
            match other_shapes.iter_mut().find(|(c, _)| *c == other) {
                Some((_, n)) => *n += 1,
                None => other_shapes.push((other, 1)),
            }
        }

        let parts = partition::<T>(rows);
        let accepted = parts.records.len();
        T::slot_mut(self).replace(parts.records);
        UploadSummary {
            category: T::CATEGORY,
            rows: total,
            accepted,
            shape_mismatches: parts.shape_mismatches,
            other_shapes,
        }
    }
}
