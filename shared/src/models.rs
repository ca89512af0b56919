//! Calendar data model.
//!
//! These types carry no wire format; handlers translate them to and from JSON.

use chrono::NaiveDate;

use crate::{Error, Result};

/// Canonical calendar date format accepted on the API.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A persisted calendar event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Store-assigned identifier, never reused.
    pub id: i32,
    /// Non-blank label.
    pub event: String,
    /// Calendar day, no time or zone.
    pub date: NaiveDate,
}

impl Event {
    /// Whether the event falls on the given day.
    pub fn is_on(&self, day: NaiveDate) -> bool {
        self.date == day
    }
}

/// An event that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub event: String,
    pub date: NaiveDate,
}

/// Parse a `YYYY-MM-DD` date.
///
/// Only the canonical zero-padded form is accepted, so `2024-5-1` or a
/// date with surrounding whitespace is rejected.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| Error::Validation(format!("Invalid date '{}': {}", value, e)))?;

    if date.format(DATE_FORMAT).to_string() != value {
        return Err(Error::Validation(format!(
            "Invalid date '{}': expected YYYY-MM-DD",
            value
        )));
    }

    Ok(date)
}

/// Inclusive date bounds used by range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Range covering every representable date.
    pub fn unbounded() -> Self {
        Self {
            start: NaiveDate::MIN,
            end: NaiveDate::MAX,
        }
    }

    /// Build a range from optional textual bounds. A missing bound is open.
    pub fn from_bounds(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let unbounded = Self::unbounded();
        Ok(Self {
            start: start.map(parse_iso_date).transpose()?.unwrap_or(unbounded.start),
            end: end.map(parse_iso_date).transpose()?.unwrap_or(unbounded.end),
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
