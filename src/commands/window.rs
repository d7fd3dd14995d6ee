use agenda_core::{NamedDateRange, WeekConvention, resolve};
use anyhow::{Context, Result};
use chrono::DateTime;
use owo_colors::OwoColorize;

use crate::config::Settings;
use crate::render::Render;

use super::viewer_now;

pub fn run(
    settings: &Settings,
    range: Option<NamedDateRange>,
    at: Option<&str>,
    first_weekday: Option<u8>,
) -> Result<()> {
    let now = viewer_now(&settings.locale)?;
    let now = match at {
        Some(at) => DateTime::parse_from_rfc3339(at)
            .with_context(|| format!("Invalid --at '{at}', expected RFC 3339"))?
            .with_timezone(&now.timezone()),
        None => now,
    };

    let range = range.unwrap_or(settings.card.date_range);
    let week = first_weekday
        .map(WeekConvention::new)
        .unwrap_or_else(|| settings.locale.week_convention());
    let window = resolve(range, &now, week);

    println!("{} {}", range.as_str().bold(), format!("({})", now.timezone()).dimmed());
    println!("  {}", window.render());
    println!("  {}", format!("start={} end={}", window.start_rfc3339(), window.end_rfc3339()).dimmed());

    Ok(())
}
