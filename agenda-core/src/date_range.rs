//! Named date ranges and their resolution to absolute windows.
//!
//! All day arithmetic happens on the viewer's local calendar: "today" is the
//! local date of `now` in the viewer's zone, and day boundaries are local
//! midnights converted back to instants.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Days, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime,
    SecondsFormat, TimeZone, Utc, Weekday,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Longest local-time gap we step across when a wall-clock time does not exist.
/// Whole skipped days have happened (Samoa, 2011-12-30).
const MAX_GAP_MINUTES: i64 = 48 * 60;
const GAP_STEP_MINUTES: i64 = 15;

/// A date range chosen in the card configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum NamedDateRange {
    #[default]
    Today,
    TodayTomorrow,
    Tomorrow,
    /// Rolling seven days starting today
    Week,
    /// From today to the last day of the current calendar week
    ThisWeek,
}

impl NamedDateRange {
    pub const ALL: [NamedDateRange; 5] = [
        NamedDateRange::Today,
        NamedDateRange::TodayTomorrow,
        NamedDateRange::Tomorrow,
        NamedDateRange::Week,
        NamedDateRange::ThisWeek,
    ];

    /// Parse a configuration value. Unrecognized values mean `today`.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "today" => NamedDateRange::Today,
            "today_tomorrow" => NamedDateRange::TodayTomorrow,
            "tomorrow" => NamedDateRange::Tomorrow,
            "week" => NamedDateRange::Week,
            "this_week" => NamedDateRange::ThisWeek,
            other => {
                warn!(date_range = other, "unknown date range, using today");
                NamedDateRange::Today
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NamedDateRange::Today => "today",
            NamedDateRange::TodayTomorrow => "today_tomorrow",
            NamedDateRange::Tomorrow => "tomorrow",
            NamedDateRange::Week => "week",
            NamedDateRange::ThisWeek => "this_week",
        }
    }
}

impl From<String> for NamedDateRange {
    fn from(s: String) -> Self {
        NamedDateRange::parse(&s)
    }
}

impl FromStr for NamedDateRange {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(NamedDateRange::parse(s))
    }
}

impl fmt::Display for NamedDateRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which weekday starts the week, numbered 0 = Sunday through 6 = Saturday.
///
/// The number is used as-is (no remapping between numbering schemes). Values
/// outside 0..=6 have no weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekConvention(u8);

impl WeekConvention {
    pub const SUNDAY: WeekConvention = WeekConvention(0);
    pub const MONDAY: WeekConvention = WeekConvention(1);
    pub const SATURDAY: WeekConvention = WeekConvention(6);

    pub fn new(index: u8) -> Self {
        WeekConvention(index)
    }

    pub fn from_weekday(weekday: Weekday) -> Self {
        WeekConvention(weekday.num_days_from_sunday() as u8)
    }

    pub fn index(&self) -> u8 {
        self.0
    }

    pub fn first_weekday(&self) -> Option<Weekday> {
        match self.0 {
            0 => Some(Weekday::Sun),
            1 => Some(Weekday::Mon),
            2 => Some(Weekday::Tue),
            3 => Some(Weekday::Wed),
            4 => Some(Weekday::Thu),
            5 => Some(Weekday::Fri),
            6 => Some(Weekday::Sat),
            _ => None,
        }
    }

    /// Days from `date` to the last day of its week (0 when `date` is that day).
    pub fn days_until_week_end(&self, date: NaiveDate) -> Option<u64> {
        let first = i64::from(self.first_weekday()?.num_days_from_sunday());
        let today = i64::from(date.weekday().num_days_from_sunday());
        Some((first - today - 1).rem_euclid(7) as u64)
    }
}

impl Default for WeekConvention {
    fn default() -> Self {
        WeekConvention::MONDAY
    }
}

/// An absolute window, `start <= end`, carrying the viewer's local offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedWindow {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl ResolvedWindow {
    /// Returns `None` when `end` precedes `start`.
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Option<Self> {
        (start <= end).then_some(ResolvedWindow { start, end })
    }

    fn instant(at: DateTime<FixedOffset>) -> Self {
        ResolvedWindow { start: at, end: at }
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn to_utc(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start.with_timezone(&Utc), self.end.with_timezone(&Utc))
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        self.start <= *instant && *instant <= self.end
    }

    /// `start` as a UTC RFC 3339 string with milliseconds (`2024-06-15T07:00:00.000Z`)
    pub fn start_rfc3339(&self) -> String {
        self.start
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// `end` as a UTC RFC 3339 string with milliseconds
    pub fn end_rfc3339(&self) -> String {
        self.end
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl fmt::Display for ResolvedWindow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} → {}",
            self.start.to_rfc3339_opts(SecondsFormat::Millis, false),
            self.end.to_rfc3339_opts(SecondsFormat::Millis, false)
        )
    }
}

/// Resolve a named range against `now` in the viewer's zone.
///
/// Never fails: anything that cannot be computed degrades to the `today`
/// window, and if even that is impossible, to the single instant `now`.
pub fn resolve<Tz: TimeZone>(
    range: NamedDateRange,
    now: &DateTime<Tz>,
    week: WeekConvention,
) -> ResolvedWindow {
    let tz = now.timezone();
    let today = now.date_naive();

    let window = match range {
        NamedDateRange::Today => day_span(&tz, Some(today), 0),
        NamedDateRange::TodayTomorrow => day_span(&tz, Some(today), 1),
        NamedDateRange::Tomorrow => day_span(&tz, today.succ_opt(), 0),
        NamedDateRange::Week => day_span(&tz, Some(today), 6),
        NamedDateRange::ThisWeek => week
            .days_until_week_end(today)
            .and_then(|days| day_span(&tz, Some(today), days)),
    };

    window
        .or_else(|| {
            warn!(%range, week = week.index(), "could not resolve date range, using today");
            day_span(&tz, Some(today), 0)
        })
        .unwrap_or_else(|| ResolvedWindow::instant(now.fixed_offset()))
}

/// From the start of `first` to the end of `first + extra_days`.
fn day_span<Tz: TimeZone>(
    tz: &Tz,
    first: Option<NaiveDate>,
    extra_days: u64,
) -> Option<ResolvedWindow> {
    let first = first?;
    let last = first.checked_add_days(Days::new(extra_days))?;
    let start = start_of_day(tz, first)?;
    let end = end_of_day(tz, last)?;
    ResolvedWindow::new(start.fixed_offset(), end.fixed_offset())
}

/// Local midnight of `date`, or the first valid instant after it.
pub fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    local_instant(tz, date.and_time(NaiveTime::MIN))
}

/// The last millisecond of `date`: one millisecond before the next day starts.
pub fn end_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    let next = start_of_day(tz, date.succ_opt()?)?;
    next.checked_sub_signed(Duration::milliseconds(1))
}

/// Map a wall-clock time to an instant. Ambiguous times take the earlier
/// instant; times inside a gap move forward to the first valid one.
pub fn local_instant<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    (0..=MAX_GAP_MINUTES / GAP_STEP_MINUTES).find_map(|step| {
        let candidate = naive.checked_add_signed(Duration::minutes(step * GAP_STEP_MINUTES))?;
        tz.from_local_datetime(&candidate).earliest()
    })
}
