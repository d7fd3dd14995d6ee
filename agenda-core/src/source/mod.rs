//! Event sources: where raw events come from.
//!
//! A source answers "events of calendar X within this window". The agenda
//! asks every selected calendar at once; a calendar that fails contributes no
//! events and is reported by id, without affecting the others.

mod home_assistant;

pub use home_assistant::HomeAssistantSource;

use std::future::Future;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::date_range::ResolvedWindow;
use crate::error::{AgendaError, AgendaResult};
use crate::event::NormalizedEvent;
use crate::normalize::{CalendarSource, RawEvent, normalize_all};

pub trait EventSource {
    /// Raw events of one calendar overlapping `window`.
    fn list_events(
        &self,
        calendar_id: &str,
        window: &ResolvedWindow,
    ) -> impl Future<Output = AgendaResult<Vec<RawEvent>>> + Send;
}

/// Result of fetching all selected calendars for one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    /// Normalized events, grouped by calendar in configuration order
    pub events: Vec<NormalizedEvent>,
    /// Ids of calendars whose fetch failed
    pub failed: Vec<String>,
}

/// Fetch every calendar concurrently and normalize the results.
///
/// Only cancellation fails the whole fetch; per-calendar failures end up in
/// [`FetchOutcome::failed`].
pub async fn fetch_events<S: EventSource + Sync>(
    source: &S,
    window: &ResolvedWindow,
    calendars: &[CalendarSource],
    cancel: &CancellationToken,
) -> AgendaResult<FetchOutcome> {
    let requests = calendars.iter().map(|calendar| async move {
        let result = source.list_events(&calendar.id, window).await;
        (calendar, result)
    });

    let results = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(AgendaError::Cancelled),
        results = join_all(requests) => results,
    };

    let mut outcome = FetchOutcome::default();
    for (calendar, result) in results {
        match result {
            Ok(records) => {
                debug!(calendar = %calendar.id, count = records.len(), "fetched events");
                outcome.events.extend(normalize_all(records, calendar));
            }
            Err(e) => {
                warn!(calendar = %calendar.id, error = %e, "calendar fetch failed");
                outcome.failed.push(calendar.id.clone());
            }
        }
    }

    Ok(outcome)
}
