//! Field parser: raw cell text → typed values.
//!
//! Every parser distinguishes three outcomes:
//! - `Ok(Some(v))` — a value was present and parsed
//! - `Ok(None)` — upstream sent a placeholder (`-`, empty, `N/A`, ...)
//! - `Err(ParseFailure)` — something was there but it is not a valid value
//!
//! [`Field`] carries the same three outcomes as a single value.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::columns::ColumnType;
use crate::domain::{EarningsDate, MarketSession};

/// Tokens upstream uses for "no value". Compared case-insensitively.
pub const PLACEHOLDERS: [&str; 7] = ["", "-", "--", "—", "n/a", "nan", "none"];

/// How far ahead a month/day without a year is searched (covers Feb 29).
const YEAR_SEARCH_SPAN: i32 = 8;

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("malformed number: {0:?}")]
    MalformedNumber(String),

    #[error("malformed percentage: {0:?}")]
    MalformedPercentage(String),

    #[error("malformed date: {0:?}")]
    MalformedDate(String),
}

/// A parsed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Text(String),
    Currency(f64),
    Percentage(f64),
    PercentagePair(Option<f64>, Option<f64>),
    Date(EarningsDate),
    Count(u32),
}

impl TypedValue {
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric payload of currency and percentage values.
    pub fn into_number(self) -> Option<f64> {
        match self {
            Self::Currency(v) | Self::Percentage(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_pair(self) -> Option<(Option<f64>, Option<f64>)> {
        match self {
            Self::PercentagePair(a, b) => Some((a, b)),
            _ => None,
        }
    }

    pub fn into_date(self) -> Option<EarningsDate> {
        match self {
            Self::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn into_count(self) -> Option<u32> {
        match self {
            Self::Count(n) => Some(n),
            _ => None,
        }
    }
}

/// Tri-state parse outcome: present, legitimately absent, or malformed.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Present(T),
    Absent,
    Malformed(ParseFailure),
}

impl<T> Field<T> {
    pub fn from_result(result: Result<Option<T>, ParseFailure>) -> Self {
        match result {
            Ok(Some(v)) => Self::Present(v),
            Ok(None) => Self::Absent,
            Err(e) => Self::Malformed(e),
        }
    }

    /// Present value, degrading malformed to absent.
    pub fn present(self) -> Option<T> {
        match self {
            Self::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Self::Present(v) => Field::Present(f(v)),
            Self::Absent => Field::Absent,
            Self::Malformed(e) => Field::Malformed(e),
        }
    }
}

pub fn is_placeholder(raw: &str) -> bool {
    let trimmed = raw.trim();
    PLACEHOLDERS
        .iter()
        .any(|p| trimmed.eq_ignore_ascii_case(p))
}

/// Parse a cell according to its column type.
///
/// `reference` anchors year inference for dates given without a year.
pub fn parse(
    raw: &str,
    column_type: ColumnType,
    reference: NaiveDate,
) -> Result<Option<TypedValue>, ParseFailure> {
    Ok(match column_type {
        ColumnType::Text => parse_text(raw).map(TypedValue::Text),
        ColumnType::Currency => parse_currency(raw)?.map(TypedValue::Currency),
        ColumnType::Percentage => parse_percentage(raw)?.map(TypedValue::Percentage),
        ColumnType::PercentagePair => {
            parse_percentage_pair(raw)?.map(|(a, b)| TypedValue::PercentagePair(a, b))
        }
        ColumnType::Date => parse_date(raw, reference)?.map(TypedValue::Date),
        ColumnType::Count => parse_count(raw)?.map(TypedValue::Count),
    })
}

pub fn parse_text(raw: &str) -> Option<String> {
    if is_placeholder(raw) {
        return None;
    }
    Some(raw.trim().to_string())
}

/// Currency magnitude: `"$1,234.5"`, `"850M"`, `"3907.83B"`, `"1.23T"`, `"-0.12"`.
///
/// Suffixes K/M/B/T (any case) scale by 10^3/6/9/12.
pub fn parse_currency(raw: &str) -> Result<Option<f64>, ParseFailure> {
    if is_placeholder(raw) {
        return Ok(None);
    }
    let malformed = || ParseFailure::MalformedNumber(raw.trim().to_string());

    let cleaned: String = raw
        .chars()
        .filter(|c| !(c.is_whitespace() || *c == '$' || *c == ','))
        .collect();
    let last = cleaned.chars().last().ok_or_else(malformed)?;
    let multiplier = match last.to_ascii_uppercase() {
        'K' => Some(1e3),
        'M' => Some(1e6),
        'B' => Some(1e9),
        'T' => Some(1e12),
        _ => None,
    };
    let body = match multiplier {
        // The suffix is ASCII, so slicing one byte off is safe.
        Some(_) => &cleaned[..cleaned.len() - 1],
        None => cleaned.as_str(),
    };

    let value = parse_finite(body).ok_or_else(malformed)?;
    Ok(Some(value * multiplier.unwrap_or(1.0)))
}

/// Signed percentage with trailing `%`: `"25.58%"` → `25.58`, `"-3.1%"` → `-3.1`.
pub fn parse_percentage(raw: &str) -> Result<Option<f64>, ParseFailure> {
    if is_placeholder(raw) {
        return Ok(None);
    }
    let malformed = || ParseFailure::MalformedPercentage(raw.trim().to_string());
    let body = raw.trim().strip_suffix('%').ok_or_else(malformed)?;
    parse_finite(&body.trim().replace(',', ""))
        .map(Some)
        .ok_or_else(malformed)
}

/// Combined surprise field: up to two `%` tokens, possibly run together
/// (`"6.24%3.88%"`) or separated by spaces or `/`.
pub fn parse_percentage_pair(
    raw: &str,
) -> Result<Option<(Option<f64>, Option<f64>)>, ParseFailure> {
    if is_placeholder(raw) {
        return Ok(None);
    }
    let malformed = || ParseFailure::MalformedPercentage(raw.trim().to_string());

    let mut tokens = Vec::with_capacity(2);
    let mut rest = raw.trim();
    while let Some(idx) = rest.find('%') {
        let token = rest[..idx].trim_matches(|c: char| c.is_whitespace() || c == '/');
        tokens.push(parse_finite(&token.replace(',', "")).ok_or_else(malformed)?);
        rest = &rest[idx + 1..];
    }
    let leftover = rest.trim_matches(|c: char| c.is_whitespace() || c == '/');
    if !is_placeholder(leftover) || tokens.is_empty() || tokens.len() > 2 {
        return Err(malformed());
    }

    Ok(Some((tokens.first().copied(), tokens.get(1).copied())))
}

/// Earnings date.
///
/// Accepted forms:
/// - `Jan 29`, `Jan 29 AMC`, `Feb 05 BMO`, `Jan 29/a`, `Jan 29/b`
/// - `Jan 29, 2025` (optionally with a session marker)
/// - `2025-01-29`
///
/// Without a year, the date is the first occurrence of that month/day on or
/// after `reference`.
pub fn parse_date(
    raw: &str,
    reference: NaiveDate,
) -> Result<Option<EarningsDate>, ParseFailure> {
    if is_placeholder(raw) {
        return Ok(None);
    }
    let malformed = || ParseFailure::MalformedDate(raw.trim().to_string());
    let (body, session) = split_session(raw.trim());

    if let Ok(date) = NaiveDate::parse_from_str(body, "%Y-%m-%d") {
        return Ok(Some(EarningsDate::new(date, session)));
    }

    let mut parts = body.split_whitespace();
    let (Some(month), Some(day), year, None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };
    let month = parse_month(month).ok_or_else(malformed)?;
    let date = match year {
        Some(year) => {
            let day: u32 = day
                .strip_suffix(',')
                .ok_or_else(malformed)?
                .parse()
                .map_err(|_| malformed())?;
            let year: i32 = year.parse().map_err(|_| malformed())?;
            NaiveDate::from_ymd_opt(year, month, day).ok_or_else(malformed)?
        }
        None => {
            let day: u32 = day.parse().map_err(|_| malformed())?;
            next_occurrence(month, day, reference).ok_or_else(malformed)?
        }
    };
    Ok(Some(EarningsDate::new(date, session)))
}

/// Non-negative integer count. `"12"`, `"1,204"`, and `"12.0"` are accepted.
pub fn parse_count(raw: &str) -> Result<Option<u32>, ParseFailure> {
    if is_placeholder(raw) {
        return Ok(None);
    }
    let malformed = || ParseFailure::MalformedNumber(raw.trim().to_string());
    let cleaned = raw.trim().replace(',', "");
    if let Ok(n) = cleaned.parse::<u32>() {
        return Ok(Some(n));
    }
    let value = parse_finite(&cleaned).ok_or_else(malformed)?;
    if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(malformed());
    }
    Ok(Some(value as u32))
}

fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Strip a trailing session marker (`BMO`/`AMC` word or `/b`, `/a` suffix).
fn split_session(s: &str) -> (&str, Option<MarketSession>) {
    if let Some((body, last)) = s.rsplit_once(char::is_whitespace) {
        if last.eq_ignore_ascii_case("bmo") {
            return (body.trim_end(), Some(MarketSession::BeforeOpen));
        }
        if last.eq_ignore_ascii_case("amc") {
            return (body.trim_end(), Some(MarketSession::AfterClose));
        }
    }
    if let Some((body, marker)) = s.rsplit_once('/') {
        if marker.eq_ignore_ascii_case("b") {
            return (body.trim_end(), Some(MarketSession::BeforeOpen));
        }
        if marker.eq_ignore_ascii_case("a") {
            return (body.trim_end(), Some(MarketSession::AfterClose));
        }
    }
    (s, None)
}

/// `"Jan"`, `"jan."`, `"Sept"`, `"January"` → month number.
fn parse_month(token: &str) -> Option<u32> {
    let lower = token.trim_end_matches('.').to_ascii_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| m.starts_with(&lower))
        .map(|i| i as u32 + 1)
}

fn next_occurrence(month: u32, day: u32, reference: NaiveDate) -> Option<NaiveDate> {
    (reference.year()..=reference.year() + YEAR_SEARCH_SPAN)
        .filter_map(|year| NaiveDate::from_ymd_opt(year, month, day))
        .find(|date| *date >= reference)
}
