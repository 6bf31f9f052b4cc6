//! Deadline classifier.
//!
//! Decides whether a scraped deadline string describes a window that has
//! already closed. The input is frequently a semicolon-joined composite of
//! everything the field extractor matched, so the rules run in strict
//! priority order and the first one that fires wins:
//!
//! 1. empty input is treated as ongoing
//! 2. an explicit closed/expired keyword short-circuits to expired
//! 3. an ongoing/rolling keyword short-circuits to open
//! 4. the first parseable date (day-month-name-year, then year-month-day,
//!    then numeric day-month-year) is compared against today at midnight
//! 5. nothing parseable fails open, so ambiguous programs are never dropped

use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use regex::Regex;

static CLOSED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(closed|expired|ended|past deadline|no longer accept(?:s|ing)?)\b").unwrap()
});

static ONGOING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(ongoing|rolling|open|no (?:closing )?deadline|always available|continuous|year[- ]round|any ?time)\b",
    )
    .unwrap()
});

static DAY_MONTHNAME_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s+(\d{4})\b",
    )
    .unwrap()
});

static YEAR_MONTH_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());

static DAY_MONTH_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[-/.](\d{1,2})[-/.](\d{4})\b").unwrap());

/// True when `deadline` describes a window that closed before today.
pub fn is_expired(deadline: &str) -> bool {
    is_expired_at(deadline, Local::now().date_naive())
}

/// Deterministic core; `today` is already normalized to a calendar date,
/// which is the midnight comparison the classifier promises.
pub fn is_expired_at(deadline: &str, today: NaiveDate) -> bool {
    let text = deadline.trim();
    if text.is_empty() {
        return false;
    }
    if CLOSED_RE.is_match(text) {
        return true;
    }
    if ONGOING_RE.is_match(text) {
        return false;
    }
    match parse_first_date(text) {
        Some(date) => date < today,
        None => false,
    }
}

/// First date parseable from the text, trying the three supported formats
/// in order. The first format that yields a valid calendar date wins;
/// conflicting dates later in a composite string are ignored.
pub fn parse_first_date(text: &str) -> Option<NaiveDate> {
    for caps in DAY_MONTHNAME_YEAR_RE.captures_iter(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2].to_lowercase());
        let year: i32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }
    for caps in YEAR_MONTH_DAY_RE.captures_iter(text) {
        let (year, month, day) = (
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }
    for caps in DAY_MONTH_YEAR_RE.captures_iter(text) {
        let (day, month, year) = (
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }
    None
}

fn month_number(prefix: &str) -> u32 {
    match prefix {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        _ => 12,
    }
}

/// True when any supported date format appears in the text, valid or not.
/// The field extractor uses this to decide whether a phrase is date-bearing.
pub fn contains_date(text: &str) -> bool {
    DAY_MONTHNAME_YEAR_RE.is_match(text)
        || YEAR_MONTH_DAY_RE.is_match(text)
        || DAY_MONTH_YEAR_RE.is_match(text)
}
