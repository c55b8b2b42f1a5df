//! Source selection and fetch state for one category.
//!
//! A [`CategoryFeed`] decides, on every change of its inputs (selected date,
//! override flag, override records), whether the category is served from the
//! override store or from the remote source, and keeps the uniform
//! `{data, loading, error}` state the dashboard renders.
//!
//! Remote lookups are split in two halves so the caller decides where the
//! blocking I/O runs:
//!
//! 1. [`CategoryFeed::resolve`] hands out a [`Ticket`] when a remote lookup is needed
//! 2. [`CategoryFeed::commit`] applies the finished lookup, but only if its ticket
//!    still belongs to the latest resolution; superseded results are discarded

use serde::Serialize;

use crate::data::store::CategoryOverride;
use crate::domain::{Category, SurveyRecord};
use crate::error::FetchError;

/// What the dashboard renders for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchState<T> {
    pub data: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        // Nothing resolved yet.
        Self {
            data: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

/// Inputs a resolution depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolveKey {
    date: Option<String>,
    override_active: bool,
    override_revision: u64,
}

/// An outstanding remote lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub category: Category,
    /// Resolution this lookup belongs to.
    pub generation: u64,
    pub date: Option<String>,
}

/// Outcome of [`CategoryFeed::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Inputs did not change since the last resolution; state is untouched.
    Unchanged,
    /// Served from override data; state is final.
    Ready,
    /// A remote lookup is needed; commit its result with this ticket.
    Pending(Ticket),
}

#[derive(Debug, Clone)]
pub struct CategoryFeed<T> {
    state: FetchState<T>,
    generation: u64,
    last_key: Option<ResolveKey>,
}

impl<T: SurveyRecord> Default for CategoryFeed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SurveyRecord> CategoryFeed<T> {
    pub fn new() -> Self {
        Self {
            state: FetchState::default(),
            generation: 0,
            last_key: None,
        }
    }

    pub fn state(&self) -> &FetchState<T> {
        &self.state
    }

    /// Forget the last inputs so the next [`resolve`](Self::resolve) runs again.
    pub fn invalidate(&mut self) {
        self.last_key = None;
    }

    /// Re-resolve if `date` or the override changed since the last call.
    ///
    /// An active override is adopted synchronously (filtered by `date`) and
    /// never leads to a remote lookup, even when it is empty for that date.
    pub fn resolve(&mut self, date: Option<&str>, overrides: &CategoryOverride<T>) -> Resolution {
        let key = ResolveKey {
            date: date.map(str::to_string),
            override_active: overrides.is_active(),
            override_revision: overrides.revision(),
        };
        if self.last_key.as_ref() == Some(&key) {
            return Resolution::Unchanged;
        }
        self.last_key = Some(key);
        self.generation += 1;

        if overrides.is_active() {
            self.state = FetchState {
                data: overrides.filtered(date),
                loading: false,
                error: None,
            };
            log::info!(
                "{}: using {} uploaded record(s) for {}",
                T::CATEGORY,
                self.state.data.len(),
                date.unwrap_or("all dates")
            );
            return Resolution::Ready;
        }

        // Last data stays visible until the lookup settles.
        self.state.loading = true;
        self.state.error = None;
        Resolution::Pending(Ticket {
            category: T::CATEGORY,
            generation: self.generation,
            date: date.map(str::to_string),
        })
    }

    /// Apply a finished lookup. Returns `false` (and changes nothing) when the
    /// ticket belongs to a superseded resolution.
    pub fn commit(&mut self, ticket: &Ticket, result: Result<Vec<T>, FetchError>) -> bool {
        if let Some(reason) = self.rejection(ticket) {
            log::debug!("{}: discarding response: {reason}", T::CATEGORY);
            return false;
        }

        match result {
            Ok(data) => {
                log::info!("{}: fetched {} record(s)", T::CATEGORY, data.len());
                self.state.data = data;
                self.state.error = None;
            }
            Err(err) => {
                log::warn!("{}: {err}", T::CATEGORY);
                self.state.error = Some(err.to_string());
            }
        }
        self.state.loading = false;
        true
    }

    /// Why `ticket` may not be committed, if it may not.
    fn rejection(&self, ticket: &Ticket) -> Option<String> {
        if ticket.category != T::CATEGORY {
            return Some(format!("ticket belongs to {}", ticket.category));
        }
        match ticket.generation.cmp(&self.generation) {
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Less => Some(format!(
                "generation {} superseded by {}",
                ticket.generation, self.generation
            )),
            std::cmp::Ordering::Greater => Some(format!(
                "generation {} was never issued (latest is {})",
                ticket.generation, self.generation
            )),
        }
    }
}
