//! Home Assistant calendar REST API.
//!
//! `GET {base}/api/calendars/{entity_id}?start=..&end=..` with a long-lived
//! access token. The response is a JSON array of events whose `start`/`end`
//! are either `{"dateTime": ..}` or `{"date": ..}`.

use std::time::Duration;

use reqwest::StatusCode;
use tokio::time::timeout;
use tracing::debug;
use url::Url;

use crate::date_range::ResolvedWindow;
use crate::error::{AgendaError, AgendaResult};
use crate::normalize::RawEvent;
use crate::source::EventSource;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct HomeAssistantSource {
    http: reqwest::Client,
    base_url: Url,
    token: String,
    timeout: Duration,
}

impl HomeAssistantSource {
    pub fn new(base_url: &str, token: &str) -> AgendaResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AgendaError::Config(format!("Invalid server URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AgendaError::Config(format!(
                "Server URL '{base_url}' cannot have a path"
            )));
        }

        Ok(HomeAssistantSource {
            http: reqwest::Client::new(),
            base_url,
            token: token.to_string(),
            timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL for one calendar's events within `window`.
    pub fn events_url(&self, calendar_id: &str, window: &ResolvedWindow) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "calendars", calendar_id]);
        }
        url.query_pairs_mut()
            .append_pair("start", &window.start_rfc3339())
            .append_pair("end", &window.end_rfc3339());
        url
    }

    async fn request(&self, calendar_id: &str, url: Url) -> AgendaResult<Vec<RawEvent>> {
        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;

        match resp.status() {
            status if status.is_success() => {
                let body = resp.text().await?;
                serde_json::from_str(&body).map_err(|e| {
                    AgendaError::Serialization(format!("Unexpected events payload for {calendar_id}: {e}"))
                })
            }
            StatusCode::UNAUTHORIZED => Err(AgendaError::Source(format!(
                "Access token rejected while fetching {calendar_id}"
            ))),
            StatusCode::NOT_FOUND => Err(AgendaError::Source(format!(
                "Calendar {calendar_id} not found"
            ))),
            status => Err(AgendaError::Source(format!(
                "Fetching {calendar_id} failed with status {status}"
            ))),
        }
    }
}

impl EventSource for HomeAssistantSource {
    async fn list_events(
        &self,
        calendar_id: &str,
        window: &ResolvedWindow,
    ) -> AgendaResult<Vec<RawEvent>> {
        let url = self.events_url(calendar_id, window);
        debug!(calendar = calendar_id, %url, "requesting events");

        timeout(self.timeout, self.request(calendar_id, url))
            .await
            .map_err(|_| AgendaError::Timeout(self.timeout.as_secs()))?
    }
}
