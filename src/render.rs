//! Terminal rendering for agenda types.
//!
//! Extension traits that add colored output to agenda-core types using
//! owo_colors.

use agenda_core::{Agenda, AgendaItem, CardConfig, Placeholder, ResolvedWindow, TimeFormat};
use chrono::{DateTime, TimeZone};
use owo_colors::OwoColorize;

/// Extension trait for terminal rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Placeholder {
    fn render(&self) -> String {
        match self {
            Placeholder::Unavailable => self.message().red().to_string(),
            _ => self.message().dimmed().to_string(),
        }
    }
}

impl Render for ResolvedWindow {
    fn render(&self) -> String {
        format!(
            "{} {} {}",
            self.start().to_rfc3339().bold(),
            "→".dimmed(),
            self.end().to_rfc3339().bold()
        )
    }
}

/// One agenda row with the locale it is shown in.
pub struct Row<'a> {
    pub item: &'a AgendaItem,
    pub time_format: TimeFormat,
}

impl Render for Row<'_> {
    fn render(&self) -> String {
        let event = &self.item.event;
        let title = match event.color.as_deref().and_then(parse_hex_color) {
            Some((r, g, b)) => event.title.truecolor(r, g, b).to_string(),
            None => event.title.clone(),
        };

        let mut line = format!("• {} - {}", title, self.when());
        if let Some(duration) = &self.item.duration {
            line.push_str(&format!(" {}", format!("({duration})").dimmed()));
        }
        line.push_str(&format!(" {}", format!("[{}]", event.calendar_id).dimmed()));
        line
    }
}

impl Row<'_> {
    /// Time only for today, date and time otherwise.
    fn when(&self) -> String {
        let start = &self.item.start;
        match (self.item.all_day, self.item.is_today) {
            (true, true) => "All day".to_string(),
            (true, false) => start.format("%a %b %-d").to_string(),
            (false, true) => format_clock(start, self.time_format),
            (false, false) => format!(
                "{} {}",
                start.format("%a %b %-d"),
                format_clock(start, self.time_format)
            ),
        }
    }
}

fn format_clock<Tz: TimeZone>(time: &DateTime<Tz>, format: TimeFormat) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match format {
        TimeFormat::TwentyFour => time.format("%H:%M").to_string(),
        TimeFormat::Twelve => time.format("%-I:%M %p").to_string(),
    }
}

/// `#rrggbb` to an RGB triple.
fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// The whole card, or `None` when the card should not be drawn at all.
pub fn render_agenda<Tz: TimeZone>(
    agenda: &Agenda,
    now: &DateTime<Tz>,
    card: &CardConfig,
    time_format: TimeFormat,
) -> Option<String> {
    if !agenda.visible {
        return None;
    }

    let mut lines = Vec::new();
    if !card.hide_background {
        let title = card.title.as_deref().unwrap_or("Agenda");
        lines.push(title.bold().to_string());
    }

    match agenda.placeholder {
        Some(placeholder) if agenda.items.is_empty() => lines.push(placeholder.render()),
        _ => lines.extend(
            agenda
                .display_items(now)
                .iter()
                .map(|item| Row { item, time_format }.render()),
        ),
    }

    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenda_core::{AgendaOptions, AgendaState, NormalizedEvent, build_agenda};
    use chrono::FixedOffset;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 15, 10, 0, 0)
            .unwrap()
    }

    fn agenda(events: &[NormalizedEvent], options: &AgendaOptions) -> Agenda {
        build_agenda(AgendaState::Loaded(events), &now(), options)
    }

    #[test]
    fn test_rows_show_time_duration_and_calendar() {
        let events = vec![
            NormalizedEvent::new("Review", "2024-06-15T14:00", Some("2024-06-15T15:00"), "cal-work"),
            NormalizedEvent::new("Trip", "2024-06-16T08:30", None, "cal-personal"),
        ];
        let card = CardConfig {
            title: Some("Family".into()),
            ..Default::default()
        };

        let output = render_agenda(&agenda(&events, &AgendaOptions::default()), &now(), &card, TimeFormat::TwentyFour)
            .expect("Should render");
        let lines: Vec<_> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Family"));
        assert!(lines[1].starts_with("• Review - 14:00"));
        assert!(lines[1].contains("(1 hour)"));
        assert!(lines[1].contains("[cal-work]"));
        assert!(lines[2].contains("Sun Jun 16 08:30"));
    }

    #[test]
    fn test_twelve_hour_clock() {
        let events = vec![NormalizedEvent::new("Review", "2024-06-15T14:00", None, "cal")];
        let card = CardConfig {
            hide_background: true,
            ..Default::default()
        };

        let output = render_agenda(&agenda(&events, &AgendaOptions::default()), &now(), &card, TimeFormat::Twelve)
            .unwrap();
        assert!(output.starts_with("• Review - 2:00 PM"), "got {output}");
    }

    #[test]
    fn test_all_day_today() {
        let events = vec![NormalizedEvent::new("Holiday", "2024-06-15", Some("2024-06-16"), "cal")];
        let card = CardConfig {
            hide_background: true,
            ..Default::default()
        };

        let output = render_agenda(&agenda(&events, &AgendaOptions::default()), &now(), &card, TimeFormat::TwentyFour)
            .unwrap();
        assert!(output.starts_with("• Holiday - All day"));
    }

    #[test]
    fn test_placeholder_and_hidden() {
        let card = CardConfig::default();
        let empty = agenda(&[], &AgendaOptions::default());
        let output = render_agenda(&empty, &now(), &card, TimeFormat::TwentyFour).unwrap();
        assert!(output.contains("No events"));

        let hidden = agenda(
            &[],
            &AgendaOptions {
                hide_when_empty: true,
                ..Default::default()
            },
        );
        assert!(render_agenda(&hidden, &now(), &card, TimeFormat::TwentyFour).is_none());
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#4285f4"), Some((0x42, 0x85, 0xf4)));
        assert_eq!(parse_hex_color("4285f4"), None);
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }
}
