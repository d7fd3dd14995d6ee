//! Conversion of raw source records into [`NormalizedEvent`]s.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::event::{EventTime, NormalizedEvent};

const UNTITLED: &str = "(No title)";

/// An event record as returned by a calendar source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default, alias = "title")]
    pub summary: Option<String>,
    #[serde(default)]
    pub start: Option<RawTime>,
    #[serde(default)]
    pub end: Option<RawTime>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub recurrence_id: Option<String>,
    #[serde(default)]
    pub rrule: Option<String>,
}

/// Start/end marker: a bare string, or an object with `dateTime` or `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTime {
    Text(String),
    Marker {
        #[serde(default, rename = "dateTime", alias = "date_time")]
        date_time: Option<String>,
        #[serde(default)]
        date: Option<String>,
    },
}

impl RawTime {
    /// The encoded value, preferring a date-time over a date.
    pub fn value(&self) -> Option<&str> {
        match self {
            RawTime::Text(s) => Some(s.as_str()),
            RawTime::Marker { date_time, date } => date_time.as_deref().or(date.as_deref()),
        }
        .filter(|s| !s.trim().is_empty())
    }
}

/// Identity and display attributes of the calendar a record came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSource {
    pub id: String,
    pub color: Option<String>,
}

impl CalendarSource {
    pub fn new(id: &str) -> Self {
        CalendarSource {
            id: id.to_string(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: Option<String>) -> Self {
        self.color = color;
        self
    }
}

/// Normalize one record. Records without a readable start are dropped.
pub fn normalize(raw: RawEvent, calendar: &CalendarSource) -> Option<NormalizedEvent> {
    let Some(start) = raw.start.as_ref().and_then(RawTime::value) else {
        debug!(calendar = %calendar.id, summary = ?raw.summary, "dropping event without start");
        return None;
    };

    if EventTime::parse(start).is_none() {
        debug!(calendar = %calendar.id, start, "dropping event with unreadable start");
        return None;
    }

    let title = raw
        .summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    Some(NormalizedEvent {
        title,
        start: start.to_string(),
        end: raw.end.as_ref().and_then(RawTime::value).map(str::to_string),
        calendar_id: calendar.id.clone(),
        color: calendar.color.clone(),
        description: raw.description,
        uid: raw.uid,
    })
}

/// Normalize every record of one calendar, keeping source order.
pub fn normalize_all(records: Vec<RawEvent>, calendar: &CalendarSource) -> Vec<NormalizedEvent> {
    records
        .into_iter()
        .filter_map(|raw| normalize(raw, calendar))
        .collect()
}
