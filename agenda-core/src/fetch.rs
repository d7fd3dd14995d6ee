//! Fetch lifecycle: `unconfigured → loading → loaded | errored`.
//!
//! Every (re)configuration issues a new generation and cancels the request
//! in flight. Results are only accepted for the current generation, so the
//! agenda never shows events fetched for a window that is no longer current.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agenda::AgendaState;
use crate::date_range::ResolvedWindow;
use crate::error::AgendaResult;
use crate::normalize::CalendarSource;
use crate::source::{EventSource, FetchOutcome, fetch_events};

#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    Unconfigured,
    Loading {
        window: ResolvedWindow,
        /// Last result for this same window, shown while refreshing
        stale: Option<FetchOutcome>,
    },
    Loaded {
        window: ResolvedWindow,
        outcome: FetchOutcome,
    },
    Errored {
        window: ResolvedWindow,
        message: String,
    },
}

/// One fetch to run against an [`EventSource`].
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub generation: u64,
    pub window: ResolvedWindow,
    pub calendars: Vec<CalendarSource>,
    pub cancel: CancellationToken,
}

impl FetchRequest {
    pub async fn execute<S: EventSource + Sync>(&self, source: &S) -> AgendaResult<FetchOutcome> {
        fetch_events(source, &self.window, &self.calendars, &self.cancel).await
    }
}

#[derive(Debug)]
pub struct FetchController {
    generation: u64,
    state: FetchState,
    in_flight: Option<CancellationToken>,
}

impl Default for FetchController {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchController {
    pub fn new() -> Self {
        FetchController {
            generation: 0,
            state: FetchState::Unconfigured,
            in_flight: None,
        }
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start over for a new window or calendar selection.
    ///
    /// Returns the request to run, or `None` when no calendar is selected.
    pub fn configure(
        &mut self,
        window: ResolvedWindow,
        calendars: Vec<CalendarSource>,
    ) -> Option<FetchRequest> {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.generation += 1;

        if calendars.is_empty() {
            debug!(generation = self.generation, "no calendar selected");
            self.state = FetchState::Unconfigured;
            return None;
        }

        let stale = match std::mem::replace(&mut self.state, FetchState::Unconfigured) {
            FetchState::Loaded { window: w, outcome } if w == window => Some(outcome),
            FetchState::Loading { window: w, stale } if w == window => stale,
            _ => None,
        };
        self.state = FetchState::Loading { window, stale };

        let cancel = CancellationToken::new();
        self.in_flight = Some(cancel.clone());
        debug!(generation = self.generation, %window, "fetch started");

        Some(FetchRequest {
            generation: self.generation,
            window,
            calendars,
            cancel,
        })
    }

    /// Record a finished fetch. Returns `false` (and changes nothing) for a
    /// superseded generation.
    pub fn complete(&mut self, generation: u64, outcome: FetchOutcome) -> bool {
        let Some(window) = self.accepting(generation) else {
            return false;
        };
        self.in_flight = None;
        self.state = FetchState::Loaded { window, outcome };
        true
    }

    /// Record a fetch that failed as a whole.
    pub fn fail(&mut self, generation: u64, message: String) -> bool {
        let Some(window) = self.accepting(generation) else {
            return false;
        };
        self.in_flight = None;
        self.state = FetchState::Errored { window, message };
        true
    }

    fn accepting(&self, generation: u64) -> Option<ResolvedWindow> {
        match &self.state {
            FetchState::Loading { window, .. } if generation == self.generation => Some(*window),
            _ => {
                debug!(generation, current = self.generation, "discarding stale fetch result");
                None
            }
        }
    }

    pub fn agenda_state(&self) -> AgendaState<'_> {
        match &self.state {
            FetchState::Unconfigured => AgendaState::NoSource,
            FetchState::Loading { stale: Some(outcome), .. } => AgendaState::Loaded(&outcome.events),
            FetchState::Loading { stale: None, .. } => AgendaState::Pending,
            FetchState::Loaded { outcome, .. } => AgendaState::Loaded(&outcome.events),
            FetchState::Errored { .. } => AgendaState::Failed,
        }
    }

    /// Calendars that failed in the result currently shown.
    pub fn failed_sources(&self) -> &[String] {
        match &self.state {
            FetchState::Loaded { outcome, .. }
            | FetchState::Loading { stale: Some(outcome), .. } => &outcome.failed,
            _ => &[],
        }
    }
}

/// Coalesces bursts of changes: ready once `quiet` has passed since the last
/// change.
#[derive(Debug, Clone)]
pub struct Debounce {
    quiet: Duration,
    last_change: Option<Instant>,
}

impl Debounce {
    pub fn new(quiet: Duration) -> Self {
        Debounce {
            quiet,
            last_change: None,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_change = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.last_change.is_some()
    }

    /// True (once) when a change is pending and the quiet period is over.
    pub fn take_ready(&mut self, now: Instant) -> bool {
        match self.last_change {
            Some(at) if now.saturating_duration_since(at) >= self.quiet => {
                self.last_change = None;
                true
            }
            _ => false,
        }
    }

    /// Time left before the pending change becomes ready.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.last_change
            .map(|at| self.quiet.saturating_sub(now.saturating_duration_since(at)))
    }
}
