//! Card and host-locale configuration.

use std::collections::HashMap;

use chrono::Weekday;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::agenda::AgendaOptions;
use crate::date_range::{NamedDateRange, WeekConvention};
use crate::error::{AgendaError, AgendaResult};
use crate::normalize::CalendarSource;

/// What one agenda card shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Single-calendar form, kept for older configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,

    /// Calendars to show, highest dedup priority first
    #[serde(default)]
    pub entities: Vec<String>,

    #[serde(default)]
    pub date_range: NamedDateRange,

    #[serde(default)]
    pub hide_background: bool,

    #[serde(default)]
    pub hide_when_empty: bool,

    #[serde(default)]
    pub dedupe: bool,

    /// Display color per calendar id
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub colors: HashMap<String, String>,
}

impl CardConfig {
    /// Selected calendar ids in priority order: `entity` first, then
    /// `entities`, repeats and blanks removed.
    pub fn calendars(&self) -> Vec<String> {
        let mut calendars: Vec<String> = Vec::new();
        for id in self.entity.iter().chain(self.entities.iter()) {
            let id = id.trim();
            if !id.is_empty() && !calendars.iter().any(|c| c == id) {
                calendars.push(id.to_string());
            }
        }
        calendars
    }

    pub fn sources(&self) -> Vec<CalendarSource> {
        self.calendars()
            .into_iter()
            .map(|id| {
                let color = self.colors.get(&id).cloned();
                CalendarSource::new(&id).with_color(color)
            })
            .collect()
    }

    pub fn agenda_options(&self) -> AgendaOptions {
        AgendaOptions {
            dedupe: self.dedupe,
            priority_order: self.calendars(),
            hide_when_empty: self.hide_when_empty,
        }
    }
}

/// First day of the week as configured: an index (0 = Sunday) or a weekday name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FirstWeekday {
    Index(u8),
    Name(String),
}

impl FirstWeekday {
    /// Unknown names yield an index with no weekday, which the resolver treats
    /// as "use today".
    pub fn convention(&self) -> WeekConvention {
        match self {
            FirstWeekday::Index(i) => WeekConvention::new(*i),
            FirstWeekday::Name(name) => name
                .parse::<Weekday>()
                .map(WeekConvention::from_weekday)
                .unwrap_or(WeekConvention::new(u8::MAX)),
        }
    }
}

impl Default for FirstWeekday {
    fn default() -> Self {
        FirstWeekday::Index(WeekConvention::default().index())
    }
}

/// Which clock the card follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeZoneMode {
    /// The viewer's machine zone
    #[default]
    Local,
    /// The zone configured on the server (`server_time_zone`)
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "24")]
    TwentyFour,
    #[serde(rename = "12")]
    Twelve,
}

/// Locale settings supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostLocale {
    #[serde(default)]
    pub first_weekday: FirstWeekday,
    #[serde(default)]
    pub time_zone: TimeZoneMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_time_zone: Option<String>,
    #[serde(default)]
    pub time_format: TimeFormat,
}

impl HostLocale {
    pub fn week_convention(&self) -> WeekConvention {
        self.first_weekday.convention()
    }

    /// The viewer's zone. `local_zone` is the machine zone name, detected by
    /// the host.
    pub fn viewer_zone(&self, local_zone: Option<&str>) -> AgendaResult<Tz> {
        let name = match self.time_zone {
            TimeZoneMode::Local => local_zone,
            TimeZoneMode::Server => self.server_time_zone.as_deref(),
        };

        match name {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| AgendaError::Config(format!("Unknown time zone '{name}': {e}"))),
            None if self.time_zone == TimeZoneMode::Server => Err(AgendaError::Config(
                "time_zone = \"server\" requires server_time_zone".into(),
            )),
            None => Ok(Tz::UTC),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let config: CardConfig = toml::from_str("").expect("Should parse empty config");
        assert_eq!(config.date_range, NamedDateRange::Today);
        assert!(config.calendars().is_empty());
        assert!(!config.dedupe);
    }

    #[test]
    fn test_calendars_merge_legacy_entity() {
        let config: CardConfig = toml::from_str(
            r#"
            entity = "calendar.work"
            entities = ["calendar.personal", "calendar.work", " ", "calendar.family"]
            date_range = "this_week"
            "#,
        )
        .expect("Should parse");

        assert_eq!(
            config.calendars(),
            ["calendar.work", "calendar.personal", "calendar.family"]
        );
        assert_eq!(config.date_range, NamedDateRange::ThisWeek);
        assert_eq!(config.agenda_options().priority_order, config.calendars());
    }

    #[test]
    fn test_unknown_date_range_falls_back() {
        let config: CardConfig = toml::from_str(r#"date_range = "someday""#).expect("Should parse");
        assert_eq!(config.date_range, NamedDateRange::Today);
    }

    #[test]
    fn test_sources_carry_colors() {
        let config: CardConfig = toml::from_str(
            r##"
            entities = ["calendar.work"]
            [colors]
            "calendar.work" = "#4285f4"
            "##,
        )
        .expect("Should parse");

        let sources = config.sources();
        assert_eq!(sources[0].color.as_deref(), Some("#4285f4"));
    }

    #[test]
    fn test_first_weekday_by_index_or_name() {
        let by_index: HostLocale = toml::from_str("first_weekday = 0").unwrap();
        assert_eq!(by_index.week_convention(), WeekConvention::SUNDAY);

        let by_name: HostLocale = toml::from_str(r#"first_weekday = "saturday""#).unwrap();
        assert_eq!(by_name.week_convention(), WeekConvention::SATURDAY);

        let unknown: HostLocale = toml::from_str(r#"first_weekday = "someday""#).unwrap();
        assert_eq!(unknown.week_convention().first_weekday(), None);

        assert_eq!(HostLocale::default().week_convention(), WeekConvention::MONDAY);
    }

    #[test]
    fn test_viewer_zone_modes() {
        let local = HostLocale::default();
        assert_eq!(local.viewer_zone(Some("Europe/Berlin")).unwrap(), chrono_tz::Europe::Berlin);
        assert_eq!(local.viewer_zone(None).unwrap(), Tz::UTC);

        let server: HostLocale = toml::from_str(
            r#"
            time_zone = "server"
            server_time_zone = "America/New_York"
            time_format = "12"
            "#,
        )
        .unwrap();
        assert_eq!(server.viewer_zone(Some("Europe/Berlin")).unwrap(), chrono_tz::America::New_York);
        assert_eq!(server.time_format, TimeFormat::Twelve);

        let misconfigured: HostLocale = toml::from_str(r#"time_zone = "server""#).unwrap();
        assert!(misconfigured.viewer_zone(None).is_err());
        assert!(local.viewer_zone(Some("Mars/Olympus")).is_err());
    }
}
