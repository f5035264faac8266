//! Relative date normalization.
//!
//! Message lists group posts under a date label that is relative to the
//! viewer ("TODAY", "YESTERDAY", "Monday"), yearless ("March 3") or explicit
//! ("March 3, 2023"), and show a bare "HH:mm" per message. `normalize_at`
//! turns such a pair into an absolute instant given the current time.

use std::sync::LazyLock;

use chrono::{
    DateTime, Datelike, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Utc, Weekday,
};
use regex::Regex;

use chatharvest_common::{HarvestError, Result};

static EXPLICIT_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}$").unwrap());
static YEARLESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+ \d+$").unwrap());
static SINGLE_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z]+$").unwrap());

const EDITED_MARKER: &str = "edited";

/// Longest clock skip a zone has made: Samoa dropped a whole day in 2011.
const MAX_GAP_HOURS: i64 = 48;

/// Normalize against the process's local clock and timezone.
pub fn normalize(date_token: &str, time_token: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    normalize_at(date_token, time_token, &Local::now())
}

/// Pure form of [`normalize`]. The timezone of `now` is treated as local time.
///
/// Returns `Ok(None)` when the time token is absent or blank: some rows,
/// service messages for instance, carry no time.
pub fn normalize_at<Tz: TimeZone>(
    date_token: &str,
    time_token: Option<&str>,
    now: &DateTime<Tz>,
) -> Result<Option<DateTime<Utc>>> {
    let Some(time_token) = time_token.filter(|t| !t.trim().is_empty()) else {
        return Ok(None);
    };

    let time = parse_time(time_token)?;
    let date = resolve_date(date_token, now.date_naive())?;

    Ok(Some(to_instant(&now.timezone(), date.and_time(time))))
}

/// Parse "HH:mm" after dropping any "edited" marker.
fn parse_time(time_token: &str) -> Result<NaiveTime> {
    let cleaned = time_token.replace(EDITED_MARKER, "");
    let cleaned = cleaned.trim();
    NaiveTime::parse_from_str(cleaned, "%H:%M")
        .map_err(|_| HarvestError::UnrecognizedTimeFormat(time_token.to_string()))
}

/// Resolve a date label relative to `today`, first matching rule wins.
pub fn resolve_date(date_token: &str, today: NaiveDate) -> Result<NaiveDate> {
    let token = date_token.trim();
    let unrecognized = || HarvestError::UnrecognizedDateFormat(date_token.to_string());

    if token.eq_ignore_ascii_case("TODAY") {
        return Ok(today);
    }
    if token.eq_ignore_ascii_case("YESTERDAY") {
        return today.pred_opt().ok_or_else(unrecognized);
    }
    if EXPLICIT_YEAR_RE.is_match(token) {
        return NaiveDate::parse_from_str(token, "%B %d, %Y").map_err(|_| unrecognized());
    }
    if YEARLESS_RE.is_match(token) {
        let with_year = format!("{token} {}", today.year());
        return NaiveDate::parse_from_str(&with_year, "%B %d %Y").map_err(|_| unrecognized());
    }
    if SINGLE_WORD_RE.is_match(token) {
        let weekday: Weekday = token.parse().map_err(|_| unrecognized())?;
        return Ok(most_recent(weekday, today));
    }

    Err(unrecognized())
}

/// Most recent `weekday` on or before `today`.
fn most_recent(weekday: Weekday, today: NaiveDate) -> NaiveDate {
    let back = (7 + today.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    today - Duration::days(back as i64)
}

/// Wall-clock time in `tz` to an instant. Ambiguous times take the earlier
/// instant; times inside a DST gap move forward by an hour, or by whole hours
/// until the clock exists again when the zone skipped more than that.
fn to_instant<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => (1..=MAX_GAP_HOURS)
            .find_map(|h| tz.from_local_datetime(&(local + Duration::hours(h))).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&local)),
    }
}
