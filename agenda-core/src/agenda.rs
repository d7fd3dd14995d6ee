//! The agenda view model: what the card shows for a fetched set of events.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::Serialize;

use crate::dedupe::dedupe;
use crate::event::{EventTime, NormalizedEvent};

/// Where the card is in its fetch lifecycle, as far as rendering cares.
#[derive(Debug, Clone, Copy)]
pub enum AgendaState<'a> {
    /// No calendar selected in the configuration
    NoSource,
    /// A fetch for the current window has not completed yet
    Pending,
    /// The fetch for the current window failed as a whole
    Failed,
    Loaded(&'a [NormalizedEvent]),
}

#[derive(Debug, Clone, Default)]
pub struct AgendaOptions {
    pub dedupe: bool,
    /// Calendar ids, highest priority first
    pub priority_order: Vec<String>,
    pub hide_when_empty: bool,
}

/// Explanatory text shown instead of an event list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    NoCalendarSelected,
    Loading,
    Unavailable,
    NoEvents,
}

impl Placeholder {
    pub fn message(&self) -> &'static str {
        match self {
            Placeholder::NoCalendarSelected => "No calendar selected",
            Placeholder::Loading => "Loading…",
            Placeholder::Unavailable => "Events unavailable",
            Placeholder::NoEvents => "No events",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Agenda {
    /// `false` means the host should render nothing at all
    pub visible: bool,
    pub items: Vec<NormalizedEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<Placeholder>,
}

/// Build the ordered list of upcoming events.
///
/// Past events (effective end not strictly after `now`) are dropped, then
/// duplicates merged when requested, then the rest sorted by start. Equal
/// starts keep their input order.
pub fn build_agenda<Tz: TimeZone>(
    state: AgendaState<'_>,
    now: &DateTime<Tz>,
    options: &AgendaOptions,
) -> Agenda {
    let events = match state {
        AgendaState::NoSource => return Agenda::placeholder(Placeholder::NoCalendarSelected),
        AgendaState::Pending => return Agenda::placeholder(Placeholder::Loading),
        AgendaState::Failed => return Agenda::placeholder(Placeholder::Unavailable),
        AgendaState::Loaded(events) => events,
    };

    let tz = now.timezone();
    let now = now.with_timezone(&Utc);

    let upcoming: Vec<NormalizedEvent> = events
        .iter()
        .filter(|event| {
            event
                .effective_end()
                .and_then(|end| end.to_instant(&tz))
                .is_some_and(|end| end > now)
        })
        .cloned()
        .collect();

    let merged = if options.dedupe {
        dedupe(upcoming, &options.priority_order)
    } else {
        upcoming
    };

    let mut keyed: Vec<(DateTime<Utc>, NormalizedEvent)> = merged
        .into_iter()
        .filter_map(|event| {
            let start = event.start_time()?.to_instant(&tz)?;
            Some((start, event))
        })
        .collect();
    keyed.sort_by_key(|(start, _)| *start);
    let items: Vec<NormalizedEvent> = keyed.into_iter().map(|(_, event)| event).collect();

    if items.is_empty() {
        return Agenda {
            visible: !options.hide_when_empty,
            items,
            placeholder: Some(Placeholder::NoEvents),
        };
    }

    Agenda {
        visible: true,
        items,
        placeholder: None,
    }
}

impl Agenda {
    fn placeholder(placeholder: Placeholder) -> Self {
        Agenda {
            visible: true,
            items: Vec::new(),
            placeholder: Some(placeholder),
        }
    }

    /// Per-item display facts for a renderer.
    pub fn display_items<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<AgendaItem> {
        let tz = now.timezone();
        let today = now.date_naive();

        self.items
            .iter()
            .filter_map(|event| {
                let start_time = event.start_time()?;
                let start = start_time.to_instant(&tz)?.with_timezone(&tz).fixed_offset();
                let duration = event
                    .end_time()
                    .and_then(|end| format_duration(&start_time, &end, &tz));
                Some(AgendaItem {
                    event: event.clone(),
                    start,
                    all_day: event.is_all_day(),
                    is_today: start_time.local_date(&tz) == today,
                    duration,
                })
            })
            .collect()
    }
}

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgendaItem {
    pub event: NormalizedEvent,
    /// Start in the viewer's zone
    pub start: DateTime<FixedOffset>,
    pub all_day: bool,
    /// Starts on the viewer's current local date (renderers show time only)
    pub is_today: bool,
    pub duration: Option<String>,
}

/// Human label for the time between `start` and `end`.
///
/// Under an hour is shown in minutes, exactly one day as "All day", then
/// whole hours below a day and whole days above. `None` if `end` precedes
/// `start`.
pub fn format_duration<Tz: TimeZone>(start: &EventTime, end: &EventTime, tz: &Tz) -> Option<String> {
    // Whole-day events count calendar days, unaffected by DST-shortened days.
    if let (EventTime::Date(start), EventTime::Date(end)) = (start, end) {
        return match (*end - *start).num_days() {
            days if days < 0 => None,
            0 | 1 => Some("All day".to_string()),
            days => Some(format!("{days} days")),
        };
    }

    let minutes = (end.to_instant(tz)? - start.to_instant(tz)?).num_minutes();
    if minutes < 0 {
        return None;
    }

    if minutes < 60 {
        return Some(format!("{minutes} min"));
    }

    let hours = minutes / 60;
    if hours == 24 {
        return Some("All day".to_string());
    }
    if hours < 24 {
        return Some(format!("{} {}", hours, if hours == 1 { "hour" } else { "hours" }));
    }

    let days = hours / 24;
    Some(format!("{} {}", days, if days == 1 { "day" } else { "days" }))
}
