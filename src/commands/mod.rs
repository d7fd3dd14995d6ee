pub mod show;
pub mod watch;
pub mod window;

use agenda_core::{CardConfig, HomeAssistantSource, HostLocale, NamedDateRange};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::ServerSettings;

pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["-", "\\", "|", "/"])
        .template("{msg} {spinner}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// The current instant on the viewer's clock.
pub fn viewer_now(locale: &HostLocale) -> Result<DateTime<Tz>> {
    let machine_zone = iana_time_zone::get_timezone()
        .inspect_err(|e| tracing::debug!("could not detect machine time zone: {e}"))
        .ok();
    let tz = locale
        .viewer_zone(machine_zone.as_deref())
        .context("Could not determine the viewer's time zone")?;
    Ok(Utc::now().with_timezone(&tz))
}

pub fn connect(server: &ServerSettings) -> Result<HomeAssistantSource> {
    let source = HomeAssistantSource::new(&server.url, server.token()?)
        .with_context(|| format!("Invalid server url '{}'", server.url))?;
    Ok(source.with_timeout(server.timeout()))
}

/// Apply command-line overrides on top of the configured card.
pub fn override_card(
    card: &CardConfig,
    range: Option<NamedDateRange>,
    calendars: &[String],
) -> CardConfig {
    let mut card = card.clone();
    if let Some(range) = range {
        card.date_range = range;
    }
    if !calendars.is_empty() {
        card.entity = None;
        card.entities = calendars.to_vec();
    }
    card
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_card() {
        let card = CardConfig {
            entity: Some("calendar.legacy".into()),
            entities: vec!["calendar.work".into()],
            ..Default::default()
        };

        let unchanged = override_card(&card, None, &[]);
        assert_eq!(unchanged, card);

        let overridden = override_card(&card, Some(NamedDateRange::Week), &["calendar.family".into()]);
        assert_eq!(overridden.date_range, NamedDateRange::Week);
        assert_eq!(overridden.calendars(), ["calendar.family"]);
    }

    #[test]
    fn test_connect_requires_token() {
        assert!(connect(&ServerSettings::default()).is_err());

        let server = ServerSettings {
            token: Some("abc".into()),
            ..Default::default()
        };
        assert!(connect(&server).is_ok());
    }
}
