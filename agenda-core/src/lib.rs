//! Core logic of the calendar agenda card.
//!
//! This crate contains everything the card does besides drawing:
//! - `date_range`: named ranges ("today", "this_week", ...) resolved to
//!   absolute windows on the viewer's local calendar
//! - `normalize` and `source`: fetching raw events per calendar and turning
//!   them into [`NormalizedEvent`]s
//! - `dedupe` and `agenda`: merging duplicates across calendars and building
//!   the ordered list to render
//! - `fetch`: the loading lifecycle that keeps stale results off screen

pub mod agenda;
pub mod card_config;
pub mod date_range;
pub mod dedupe;
pub mod error;
pub mod event;
pub mod fetch;
pub mod normalize;
pub mod source;

pub use agenda::{Agenda, AgendaItem, AgendaOptions, AgendaState, Placeholder, build_agenda};
pub use card_config::{CardConfig, HostLocale, TimeFormat};
pub use date_range::{NamedDateRange, ResolvedWindow, WeekConvention, resolve};
pub use dedupe::dedupe;
pub use error::{AgendaError, AgendaResult};
pub use event::{EventTime, NormalizedEvent};
pub use fetch::{Debounce, FetchController, FetchRequest, FetchState};
pub use source::{EventSource, FetchOutcome, HomeAssistantSource};
