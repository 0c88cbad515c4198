//! Recurrence rule grammar -- a practical subset of RFC 5545 RRULE syntax.
//!
//! A rule is a `;`-separated list of `KEY=VALUE` tokens. Recognized keys:
//!
//! - `FREQ` (mandatory) -- `DAILY`, `WEEKLY`, `MONTHLY` or `YEARLY`
//! - `INTERVAL` -- positive integer, defaults to 1
//! - `BYDAY` -- comma-separated weekday codes (`MO`..`SU`); `MONTHLY` and `YEARLY`
//!   rules may prefix an ordinal (`3SA`, `-1FR`) for "Nth weekday" patterns
//! - `COUNT` -- positive integer
//! - `UNTIL` -- `YYYYMMDD`, `YYYYMMDDTHHMMSS` or `YYYYMMDDTHHMMSSZ`
//!
//! `COUNT` and `UNTIL` are mutually exclusive. Keys and values are matched
//! case-insensitively. Anything else is rejected.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a rule string was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("empty rule")]
    Empty,

    #[error("malformed token '{0}' (expected KEY=VALUE)")]
    MalformedToken(String),

    #[error("unknown key '{0}'")]
    UnknownKey(String),

    #[error("duplicate key '{0}'")]
    DuplicateKey(String),

    #[error("missing FREQ")]
    MissingFrequency,

    #[error("unsupported frequency '{0}'")]
    UnsupportedFrequency(String),

    #[error("invalid INTERVAL '{0}'")]
    InvalidInterval(String),

    #[error("invalid BYDAY entry '{0}'")]
    InvalidByDay(String),

    #[error("ordinal BYDAY entry '{entry}' is not allowed with FREQ={frequency}")]
    OrdinalNotAllowed { entry: String, frequency: Frequency },

    #[error("invalid COUNT '{0}'")]
    InvalidCount(String),

    #[error("invalid UNTIL '{0}'")]
    InvalidUntil(String),

    #[error("COUNT and UNTIL are mutually exclusive")]
    CountWithUntil,
}

/// Repetition frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Wire name, as written after `FREQ=`.
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }

    /// Largest absolute BYDAY ordinal this frequency accepts, or `None` when
    /// ordinals are not allowed at all.
    fn max_ordinal(self) -> Option<i8> {
        match self {
            Frequency::Monthly => Some(5),
            Frequency::Yearly => Some(53),
            Frequency::Daily | Frequency::Weekly => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            _ => Err(RuleError::UnsupportedFrequency(s.to_string())),
        }
    }
}

/// One `BYDAY` entry: a weekday with an optional ordinal (`3SA` = third Saturday,
/// `-1FR` = last Friday).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayNum {
    pub ordinal: Option<i8>,
    pub weekday: Weekday,
}

impl WeekdayNum {
    /// Every `weekday` in the period.
    pub fn every(weekday: Weekday) -> Self {
        Self {
            ordinal: None,
            weekday,
        }
    }

    /// The `ordinal`-th `weekday` of the period; negative counts from the end.
    pub fn nth(ordinal: i8, weekday: Weekday) -> Self {
        Self {
            ordinal: Some(ordinal),
            weekday,
        }
    }
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.ordinal {
            write!(f, "{}", n)?;
        }
        f.write_str(weekday_code(self.weekday))
    }
}

/// How a series ends, if it ends at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Count(u32),
    Until(NaiveDateTime),
}

/// A parsed, validated recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u16,
    pub by_day: Vec<WeekdayNum>,
    pub termination: Option<Termination>,
}

impl RecurrenceRule {
    /// An open-ended rule repeating every period.
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            by_day: Vec::new(),
            termination: None,
        }
    }

    pub fn count(&self) -> Option<u32> {
        match self.termination {
            Some(Termination::Count(n)) => Some(n),
            _ => None,
        }
    }

    pub fn until(&self) -> Option<NaiveDateTime> {
        match self.termination {
            Some(Termination::Until(t)) => Some(t),
            _ => None,
        }
    }
}

impl FromStr for RecurrenceRule {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RuleError::Empty);
        }

        let mut frequency = None;
        let mut interval = None;
        let mut by_day: Option<Vec<(String, WeekdayNum)>> = None;
        let mut count = None;
        let mut until = None;
        let mut seen: Vec<String> = Vec::new();

        for token in s.split(';') {
            let (key, value) = token
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .filter(|(k, v)| !k.is_empty() && !v.is_empty())
                .ok_or_else(|| RuleError::MalformedToken(token.to_string()))?;

            let key = key.to_ascii_uppercase();
            if seen.contains(&key) {
                return Err(RuleError::DuplicateKey(key));
            }

            match key.as_str() {
                "FREQ" => frequency = Some(value.parse::<Frequency>()?),
                "INTERVAL" => interval = Some(parse_interval(value)?),
                "BYDAY" => by_day = Some(parse_by_day(value)?),
                "COUNT" => count = Some(parse_count(value)?),
                "UNTIL" => until = Some(parse_until(value)?),
                _ => return Err(RuleError::UnknownKey(key)),
            }
            seen.push(key);
        }

        let frequency = frequency.ok_or(RuleError::MissingFrequency)?;

        let by_day = by_day
            .unwrap_or_default()
            .into_iter()
            .map(|(entry, day)| check_ordinal(entry, day, frequency))
            .collect::<Result<Vec<_>, _>>()?;

        let termination = match (count, until) {
            (Some(_), Some(_)) => return Err(RuleError::CountWithUntil),
            (Some(n), None) => Some(Termination::Count(n)),
            (None, Some(t)) => Some(Termination::Until(t)),
            (None, None) => None,
        };

        Ok(Self {
            frequency,
            interval: interval.unwrap_or(1),
            by_day,
            termination,
        })
    }
}

impl fmt::Display for RecurrenceRule {
    /// Canonical form: keys in a fixed order, default INTERVAL omitted, UNTIL in UTC
    /// basic format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.frequency)?;
        if self.interval != 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        if !self.by_day.is_empty() {
            let days: Vec<String> = self.by_day.iter().map(|d| d.to_string()).collect();
            write!(f, ";BYDAY={}", days.join(","))?;
        }
        match self.termination {
            Some(Termination::Count(n)) => write!(f, ";COUNT={}", n),
            Some(Termination::Until(t)) => write!(f, ";UNTIL={}Z", t.format("%Y%m%dT%H%M%S")),
            None => Ok(()),
        }
    }
}

/// Check a rule string against the recognized grammar.
///
/// An empty string is reported as invalid; callers that store templates treat an
/// empty rule as "not recurring" before ever asking.
pub fn is_valid_rule(rule: &str) -> bool {
    rule.parse::<RecurrenceRule>().is_ok()
}

pub(crate) fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

fn parse_weekday_code(code: &str) -> Option<Weekday> {
    match code {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Strictly positive decimal integer, digits only (no sign, no whitespace).
fn parse_positive(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse::<u64>().ok().filter(|n| *n > 0)
}

fn parse_interval(value: &str) -> Result<u16, RuleError> {
    parse_positive(value)
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| RuleError::InvalidInterval(value.to_string()))
}

fn parse_count(value: &str) -> Result<u32, RuleError> {
    parse_positive(value)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| RuleError::InvalidCount(value.to_string()))
}

fn parse_until(value: &str) -> Result<NaiveDateTime, RuleError> {
    let invalid = || RuleError::InvalidUntil(value.to_string());
    let upper = value.to_ascii_uppercase();
    let bare = upper.strip_suffix('Z').unwrap_or(&upper);

    match bare.len() {
        // Date-only UNTIL is inclusive of the whole day.
        8 if bare.bytes().all(|b| b.is_ascii_digit()) => NaiveDate::parse_from_str(bare, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .ok_or_else(invalid),
        15 if bare.as_bytes()[8] == b'T'
            && bare
                .bytes()
                .enumerate()
                .all(|(i, b)| i == 8 || b.is_ascii_digit()) =>
        {
            NaiveDateTime::parse_from_str(bare, "%Y%m%dT%H%M%S").map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

fn parse_by_day(value: &str) -> Result<Vec<(String, WeekdayNum)>, RuleError> {
    value
        .split(',')
        .map(|raw| {
            let entry = raw.trim().to_ascii_uppercase();
            let day = parse_weekday_num(&entry)
                .ok_or_else(|| RuleError::InvalidByDay(raw.trim().to_string()))?;
            Ok((entry, day))
        })
        .collect()
}

fn parse_weekday_num(entry: &str) -> Option<WeekdayNum> {
    if entry.len() < 2 || !entry.is_ascii() {
        return None;
    }
    let (prefix, code) = entry.split_at(entry.len() - 2);
    let weekday = parse_weekday_code(code)?;
    if prefix.is_empty() {
        return Some(WeekdayNum::every(weekday));
    }

    let (negative, digits) = match prefix.as_bytes()[0] {
        b'+' => (false, &prefix[1..]),
        b'-' => (true, &prefix[1..]),
        _ => (false, prefix),
    };
    let n = parse_positive(digits).and_then(|n| i8::try_from(n).ok())?;
    Some(WeekdayNum::nth(if negative { -n } else { n }, weekday))
}

fn check_ordinal(
    entry: String,
    day: WeekdayNum,
    frequency: Frequency,
) -> Result<WeekdayNum, RuleError> {
    let Some(n) = day.ordinal else {
        return Ok(day);
    };
    match frequency.max_ordinal() {
        None => Err(RuleError::OrdinalNotAllowed { entry, frequency }),
        Some(max) if n.unsigned_abs() > max.unsigned_abs() => Err(RuleError::InvalidByDay(entry)),
        Some(_) => Ok(day),
    }
}
