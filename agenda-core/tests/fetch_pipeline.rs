use std::collections::HashMap;
use std::time::Duration;

use agenda_core::normalize::{RawEvent, RawTime};
use agenda_core::{
    AgendaError, AgendaResult, AgendaState, CardConfig, EventSource, FetchController, FetchState,
    NamedDateRange, Placeholder, ResolvedWindow, WeekConvention, build_agenda, resolve,
};
use chrono::TimeZone;
use chrono_tz::Europe::Berlin;

/// In-memory source: calendar id → events, or an error message.
struct FakeSource {
    calendars: HashMap<String, Result<Vec<RawEvent>, String>>,
    delay: Duration,
}

impl FakeSource {
    fn new() -> Self {
        FakeSource {
            calendars: HashMap::new(),
            delay: Duration::ZERO,
        }
    }

    fn with(mut self, id: &str, events: Vec<RawEvent>) -> Self {
        self.calendars.insert(id.to_string(), Ok(events));
        self
    }

    fn failing(mut self, id: &str) -> Self {
        self.calendars.insert(id.to_string(), Err("offline".to_string()));
        self
    }
}

impl EventSource for FakeSource {
    async fn list_events(
        &self,
        calendar_id: &str,
        _window: &ResolvedWindow,
    ) -> AgendaResult<Vec<RawEvent>> {
        tokio::time::sleep(self.delay).await;
        match self.calendars.get(calendar_id) {
            Some(Ok(events)) => Ok(events.clone()),
            Some(Err(message)) => Err(AgendaError::Source(message.clone())),
            None => Err(AgendaError::Source(format!("unknown calendar {calendar_id}"))),
        }
    }
}

fn raw(summary: &str, start: &str, end: Option<&str>) -> RawEvent {
    RawEvent {
        summary: Some(summary.to_string()),
        start: Some(RawTime::Text(start.to_string())),
        end: end.map(|e| RawTime::Text(e.to_string())),
        ..Default::default()
    }
}

fn config(toml_source: &str) -> CardConfig {
    toml::from_str(toml_source).expect("Should parse card config")
}

#[tokio::test]
async fn test_pipeline_merges_filters_and_sorts() {
    let now = Berlin.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
    let card = config(
        r#"
        entities = ["cal-work", "cal-personal", "cal-broken"]
        date_range = "today"
        dedupe = true
        "#,
    );

    let source = FakeSource::new()
        .with(
            "cal-personal",
            vec![
                raw("Lunch", "2024-06-15T12:00", Some("2024-06-15T13:00")),
                raw("Gym", "2024-06-15T18:00", Some("2024-06-15T19:00")),
            ],
        )
        .with(
            "cal-work",
            vec![
                raw("Standup", "2024-06-15T09:00", Some("2024-06-15T09:15")),
                raw("Review", "2024-06-15T14:00", Some("2024-06-15T15:00")),
                raw("Lunch", "2024-06-15T12:00", Some("2024-06-15T13:00")),
            ],
        )
        .failing("cal-broken");

    let window = resolve(card.date_range, &now, WeekConvention::MONDAY);
    let mut controller = FetchController::new();
    let request = controller
        .configure(window, card.sources())
        .expect("Should issue request");

    let outcome = request.execute(&source).await.expect("Should fetch");
    assert!(controller.complete(request.generation, outcome));
    assert_eq!(controller.failed_sources(), ["cal-broken"]);

    let agenda = build_agenda(controller.agenda_state(), &now, &card.agenda_options());
    let rows: Vec<_> = agenda
        .items
        .iter()
        .map(|e| (e.title.as_str(), e.calendar_id.as_str()))
        .collect();
    assert_eq!(
        rows,
        [("Lunch", "cal-work"), ("Review", "cal-work"), ("Gym", "cal-personal")]
    );
}

#[tokio::test]
async fn test_cancelled_request_yields_cancelled() {
    let now = Berlin.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
    let mut source = FakeSource::new().with("cal-work", vec![raw("Late", "2024-06-15T20:00", None)]);
    source.delay = Duration::from_secs(30);

    let mut controller = FetchController::new();
    let window = resolve(NamedDateRange::Today, &now, WeekConvention::MONDAY);
    let first = controller
        .configure(window, vec![agenda_core::normalize::CalendarSource::new("cal-work")])
        .unwrap();

    let fetch = tokio::spawn({
        let first = first.clone();
        async move { first.execute(&source).await }
    });

    // Reconfiguring cancels the request above.
    let tomorrow = resolve(NamedDateRange::Tomorrow, &now, WeekConvention::MONDAY);
    let second = controller
        .configure(tomorrow, vec![agenda_core::normalize::CalendarSource::new("cal-work")])
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), fetch)
        .await
        .expect("Cancelled fetch should finish promptly")
        .expect("Task should not panic");
    assert!(matches!(result, Err(AgendaError::Cancelled)));

    assert!(!controller.fail(first.generation, "cancelled".into()));
    assert!(matches!(controller.state(), FetchState::Loading { .. }));
    assert_eq!(controller.generation(), second.generation);
}

#[tokio::test]
async fn test_hide_when_empty_after_load() {
    let now = Berlin.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
    let card = config(
        r#"
        entity = "cal-work"
        hide_when_empty = true
        "#,
    );
    let source = FakeSource::new().with("cal-work", vec![raw("Over", "2024-06-15T08:00", Some("2024-06-15T09:00"))]);

    let mut controller = FetchController::new();
    let window = resolve(card.date_range, &now, WeekConvention::MONDAY);
    let request = controller.configure(window, card.sources()).unwrap();

    let pending = build_agenda(controller.agenda_state(), &now, &card.agenda_options());
    assert!(pending.visible);
    assert_eq!(pending.placeholder, Some(Placeholder::Loading));

    let outcome = request.execute(&source).await.unwrap();
    controller.complete(request.generation, outcome);

    let agenda = build_agenda(controller.agenda_state(), &now, &card.agenda_options());
    assert!(!agenda.visible);
    assert!(agenda.items.is_empty());
}

#[tokio::test]
async fn test_no_calendar_selected() {
    let now = Berlin.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
    let card = config("hide_when_empty = true");

    let mut controller = FetchController::new();
    let window = resolve(card.date_range, &now, WeekConvention::MONDAY);
    assert!(controller.configure(window, card.sources()).is_none());

    let agenda = build_agenda(controller.agenda_state(), &now, &card.agenda_options());
    assert!(matches!(controller.agenda_state(), AgendaState::NoSource));
    assert!(agenda.visible);
    assert_eq!(agenda.placeholder, Some(Placeholder::NoCalendarSelected));
}
