//! Occurrence generation -- turns a rule anchored at a template's start into the
//! concrete start times that fall inside a query window.
//!
//! Rules are validated against the grammar in [`crate::rule`], rendered in canonical
//! form and handed to the `rrule` crate with a UTC `DTSTART`. Timestamps are floating
//! wall-clock values, so there is no DST adjustment: every occurrence keeps the
//! anchor's time of day.
//!
//! ## Calendar edge cases
//!
//! Day-of-month overflow is skipped, never clamped. A monthly rule anchored on the
//! 31st produces nothing in 30-day months, and a yearly rule anchored on Feb 29 only
//! fires in leap years.
//!
//! The anchor itself is always emitted first when it lies inside the window, even if
//! it does not match a `BYDAY` filter. `COUNT` counts rule matches only.

use chrono::{Duration, Months, NaiveDateTime, SubsecRound, TimeZone};
use rrule::RRuleSet;

use crate::error::{EngineError, Result};
use crate::rule::RecurrenceRule;
use crate::window::Window;

/// Per-template cap used for month views.
pub const DEFAULT_MAX_INSTANCES: usize = 100;

/// How far [`next_occurrence`] looks ahead of its starting point.
pub const DEFAULT_LOOKAHEAD_MONTHS: u32 = 12;

/// The result of expanding one rule over one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion<T = NaiveDateTime> {
    /// Strictly increasing.
    pub items: Vec<T>,
    /// Set when the instance cap cut the list short before the window was exhausted.
    pub truncated: bool,
}

impl<T> Default for Expansion<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            truncated: false,
        }
    }
}

impl<T> Expansion<T> {
    /// Convert every item with a fallible `f`, keeping the truncation flag.
    ///
    /// # Errors
    /// Returns the first error produced by `f`; later items are not visited.
    pub fn try_map<U, E>(
        self,
        f: impl FnMut(T) -> std::result::Result<U, E>,
    ) -> std::result::Result<Expansion<U>, E> {
        Ok(Expansion {
            items: self.items.into_iter().map(f).collect::<std::result::Result<_, _>>()?,
            truncated: self.truncated,
        })
    }
}

/// Expand `rule` anchored at `anchor` into start times within `[range_start, range_end]`,
/// returning at most `max_instances` of them.
///
/// # Arguments
/// - `rule` -- rule string in the supported grammar (e.g., "FREQ=WEEKLY;BYDAY=MO")
/// - `anchor` -- the template's start; the first possible occurrence
/// - `range_start` -- inclusive lower bound of the query window
/// - `range_end` -- inclusive upper bound of the query window
/// - `max_instances` -- cap on returned items; `truncated` is set when it cuts the list
///
/// # Errors
/// Returns `EngineError::InvalidRule` if the rule does not match the grammar, and
/// `EngineError::Expansion` if the expansion backend rejects it.
pub fn expand_occurrences(
    rule: &str,
    anchor: NaiveDateTime,
    range_start: NaiveDateTime,
    range_end: NaiveDateTime,
    max_instances: usize,
) -> Result<Expansion> {
    let rule: RecurrenceRule = rule.parse()?;
    expand_rule(&rule, anchor, range_start, range_end, max_instances)
}

/// Same as [`expand_occurrences`] for an already parsed rule.
///
/// # Errors
/// Returns `EngineError::Expansion` if the expansion backend rejects the rule.
pub fn expand_rule(
    rule: &RecurrenceRule,
    anchor: NaiveDateTime,
    range_start: NaiveDateTime,
    range_end: NaiveDateTime,
    max_instances: usize,
) -> Result<Expansion> {
    let anchor = anchor.trunc_subsecs(0);

    // Nothing can start before the anchor or inside an inverted window.
    if range_start > range_end || range_end < anchor {
        return Ok(Expansion::default());
    }
    let in_window = |t: &NaiveDateTime| *t >= range_start && *t <= range_end;

    let mut items = Vec::new();
    if in_window(&anchor) {
        items.push(anchor);
    }

    // An UNTIL before the anchor leaves a series of one.
    let exhausted = rule.until().is_some_and(|until| until < anchor);
    if !exhausted {
        // One past the cap so truncation is observable.
        let limit = u16::try_from(max_instances.saturating_add(1)).unwrap_or(u16::MAX);
        let rrule_set = build_rrule_set(rule, anchor)?;

        // Pad the bounds by a second and filter exactly below, so the result does not
        // depend on whether the backend treats them as inclusive.
        let after = shift(range_start.max(anchor), -1);
        let before = shift(range_end, 1);
        let result = rrule_set
            .after(rrule::Tz::UTC.from_utc_datetime(&after))
            .before(rrule::Tz::UTC.from_utc_datetime(&before))
            .all(limit);

        items.extend(
            result
                .dates
                .iter()
                .map(|dt| dt.naive_utc())
                .filter(|t| *t > anchor && in_window(t)),
        );
    }

    let truncated = items.len() > max_instances;
    items.truncate(max_instances);

    Ok(Expansion { items, truncated })
}

/// Occurrence start times of `rule` inside `[range_start, range_end]`, at most
/// `max_instances` of them.
///
/// Arguments are the same as for [`expand_occurrences`]. Invalid rules produce an
/// empty list instead of an error, logged at debug level. A valid rule the backend
/// cannot expand (e.g., an anchor outside its supported years) also produces an
/// empty list and is logged as a warning. Use [`expand_occurrences`] when the
/// reason or the truncation flag matters.
pub fn generate(
    rule: &str,
    anchor: NaiveDateTime,
    range_start: NaiveDateTime,
    range_end: NaiveDateTime,
    max_instances: usize,
) -> Vec<NaiveDateTime> {
    match expand_occurrences(rule, anchor, range_start, range_end, max_instances) {
        Ok(expansion) => expansion.items,
        Err(e @ EngineError::InvalidRule(_)) => {
            tracing::debug!(rule, error = %e, "rule produces no occurrences");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(rule, %anchor, error = %e, "valid rule could not be expanded");
            Vec::new()
        }
    }
}

/// Occurrences of `rule` within one calendar month, capped at
/// [`DEFAULT_MAX_INSTANCES`]. An impossible month yields nothing.
pub fn generate_monthly(
    rule: &str,
    anchor: NaiveDateTime,
    year: i32,
    month: u32,
) -> Vec<NaiveDateTime> {
    match Window::month(year, month) {
        Ok(window) => generate(rule, anchor, window.start, window.end, DEFAULT_MAX_INSTANCES),
        Err(_) => Vec::new(),
    }
}

/// The first occurrence strictly after `from`, looking at most
/// [`DEFAULT_LOOKAHEAD_MONTHS`] ahead.
///
/// # Arguments
/// - `rule` -- rule string in the supported grammar
/// - `anchor` -- the template's start
/// - `from` -- exclusive starting point of the search
///
/// Returns `None` for an invalid rule, an exhausted series, or when nothing occurs
/// before the horizon.
pub fn next_occurrence(
    rule: &str,
    anchor: NaiveDateTime,
    from: NaiveDateTime,
) -> Option<NaiveDateTime> {
    next_occurrence_with(rule, anchor, from, DEFAULT_LOOKAHEAD_MONTHS)
}

/// [`next_occurrence`] with an explicit lookahead horizon in months.
pub fn next_occurrence_with(
    rule: &str,
    anchor: NaiveDateTime,
    from: NaiveDateTime,
    lookahead_months: u32,
) -> Option<NaiveDateTime> {
    let horizon = from.checked_add_months(Months::new(lookahead_months))?;
    // At most one result can equal `from`; the second one is then strictly after it.
    generate(rule, anchor, from, horizon, 2)
        .into_iter()
        .find(|t| *t > from)
}

fn build_rrule_set(rule: &RecurrenceRule, anchor: NaiveDateTime) -> Result<RRuleSet> {
    let text = format!(
        "DTSTART:{}Z\nRRULE:{}",
        anchor.format("%Y%m%dT%H%M%S"),
        rule
    );
    text.parse::<RRuleSet>().map_err(|e| {
        tracing::warn!(rule = %rule, error = %e, "expansion backend rejected rule");
        EngineError::Expansion(e.to_string())
    })
}

fn shift(t: NaiveDateTime, seconds: i64) -> NaiveDateTime {
    t.checked_add_signed(Duration::seconds(seconds)).unwrap_or(t)
}
