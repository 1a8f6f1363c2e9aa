//! OAI-PMH datestamps.
//!
//! Harvesters send `from` and `until` either at day granularity
//! (`YYYY-MM-DD`) or at second granularity (`YYYY-MM-DDThh:mm:ssZ`), always
//! in UTC. Bounds are inclusive: a day-granularity `until` covers the whole
//! day, and a second-granularity `until` covers the whole second, because
//! datestamps in responses are truncated to seconds.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{OaiError, Result};

lazy_static! {
    static ref DATESTAMP: Regex =
        Regex::new(r"^(\d{4})-(\d{2})-(\d{2})(?:T(\d{2}):(\d{2}):(\d{2})Z)?$")
            .expect("datestamp pattern is valid");
}

/// Precision of a datestamp argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// `YYYY-MM-DD`
    Day,
    /// `YYYY-MM-DDThh:mm:ssZ`
    Second,
}

/// A parsed datestamp argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datestamp {
    /// The instant the bound resolves to.
    pub value: DateTime<Utc>,
    /// Precision the harvester used.
    pub granularity: Granularity,
}

/// Parse a `from` argument; the bound is the start of the day or second.
///
/// # Errors
///
/// Returns [`OaiError::BadArgument`] if the value is not a valid datestamp.
pub fn parse_from(raw: &str) -> Result<Datestamp> {
    parse(raw)
}

/// Parse an `until` argument; the bound is the end of the day or second.
///
/// # Errors
///
/// Returns [`OaiError::BadArgument`] if the value is not a valid datestamp.
pub fn parse_until(raw: &str) -> Result<Datestamp> {
    let start = parse(raw)?;
    let span = match start.granularity {
        Granularity::Day => Duration::days(1),
        Granularity::Second => Duration::seconds(1),
    };
    Ok(Datestamp {
        value: start.value + span - Duration::nanoseconds(1),
        granularity: start.granularity,
    })
}

/// Render an instant as a second-granularity datestamp.
#[must_use]
pub fn format_datestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse(raw: &str) -> Result<Datestamp> {
    let invalid = || OaiError::BadArgument(format!("invalid datestamp '{raw}'"));
    let caps = DATESTAMP.captures(raw).ok_or_else(invalid)?;

    let number = |i: usize| -> Option<u32> { caps.get(i).and_then(|m| m.as_str().parse().ok()) };
    let year = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .ok_or_else(invalid)?;
    let month = number(2).ok_or_else(invalid)?;
    let day = number(3).ok_or_else(invalid)?;
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;

    let (time, granularity) = if caps.get(4).is_some() {
        let time = NaiveTime::from_hms_opt(
            number(4).ok_or_else(invalid)?,
            number(5).ok_or_else(invalid)?,
            number(6).ok_or_else(invalid)?,
        )
        .ok_or_else(invalid)?;
        (time, Granularity::Second)
    } else {
        (NaiveTime::MIN, Granularity::Day)
    };

    Ok(Datestamp {
        value: NaiveDateTime::new(date, time).and_utc(),
        granularity,
    })
}
