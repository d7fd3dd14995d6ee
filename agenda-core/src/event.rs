//! Normalized, provider-neutral event types.
//!
//! Sources hand back raw records in whatever shape their API uses; the
//! normalizer turns them into [`NormalizedEvent`]s, and everything downstream
//! (dedup, filtering, sorting, rendering) works exclusively with those.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::date_range::{local_instant, start_of_day};

/// A calendar event as the agenda sees it.
///
/// `start` and `end` keep the source's own string encoding. Two events are
/// duplicate candidates iff `title` and `start` are exactly equal strings, so
/// the encoding is never rewritten here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub title: String,
    pub start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    /// Calendar source the event came from (used for priority and coloring)
    pub calendar_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl NormalizedEvent {
    pub fn new(title: &str, start: &str, end: Option<&str>, calendar_id: &str) -> Self {
        NormalizedEvent {
            title: title.to_string(),
            start: start.to_string(),
            end: end.map(str::to_string),
            calendar_id: calendar_id.to_string(),
            color: None,
            description: None,
            uid: None,
        }
    }

    pub fn start_time(&self) -> Option<EventTime> {
        EventTime::parse(&self.start)
    }

    pub fn end_time(&self) -> Option<EventTime> {
        self.end.as_deref().and_then(EventTime::parse)
    }

    /// End if present and readable, otherwise start.
    pub fn effective_end(&self) -> Option<EventTime> {
        self.end_time().or_else(|| self.start_time())
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self.start_time(), Some(EventTime::Date(_)))
    }
}

impl fmt::Display for NormalizedEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Parsed form of an encoded event start or end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    /// All-day marker (`2024-06-15`), begins at the viewer's local midnight
    Date(NaiveDate),
    /// Date-time carrying an offset, normalized to UTC
    DateTimeUtc(DateTime<Utc>),
    /// Date-time without an offset, read in the viewer's zone
    Floating(NaiveDateTime),
}

const FLOATING_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

impl EventTime {
    /// Parse a plain date, an RFC 3339 date-time or a floating date-time.
    pub fn parse(s: &str) -> Option<EventTime> {
        let s = s.trim();

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(EventTime::Date(date));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(EventTime::DateTimeUtc(dt.with_timezone(&Utc)));
        }

        FLOATING_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(EventTime::Floating)
    }

    /// The absolute instant this marker denotes for a viewer in `tz`.
    pub fn to_instant<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Utc>> {
        match self {
            EventTime::Date(d) => start_of_day(tz, *d).map(|dt| dt.with_timezone(&Utc)),
            EventTime::DateTimeUtc(dt) => Some(*dt),
            EventTime::Floating(naive) => local_instant(tz, *naive).map(|dt| dt.with_timezone(&Utc)),
        }
    }

    /// The viewer-local calendar date of this marker.
    pub fn local_date<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        match self {
            EventTime::Date(d) => *d,
            EventTime::DateTimeUtc(dt) => dt.with_timezone(tz).date_naive(),
            EventTime::Floating(naive) => naive.date(),
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.to_rfc3339()),
            EventTime::Floating(naive) => write!(f, "{}", naive.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}
