//! Event templates and their alarms.
//!
//! Templates are owned by the persistence layer; this crate only reads them.

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::expander::{self, Expansion};
use crate::identity::VirtualId;
use crate::rule::RuleError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TemplateId(pub i64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct OwnerId(pub i64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CategoryId(pub i64);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unit of an alarm's lead time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmUnit {
    #[serde(rename = "MIN")]
    Minutes,
    #[serde(rename = "HOUR")]
    Hours,
    #[serde(rename = "DAY")]
    Days,
}

/// "Notify me N units before the event starts."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub notify_before: u32,
    pub unit: AlarmUnit,
}

impl Alarm {
    /// How long before the start the alarm fires.
    pub fn lead_time(&self) -> Duration {
        let n = i64::from(self.notify_before);
        match self.unit {
            AlarmUnit::Minutes => Duration::minutes(n),
            AlarmUnit::Hours => Duration::hours(n),
            AlarmUnit::Days => Duration::days(n),
        }
    }
}

/// A stored event definition, optionally recurring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub owner_id: OwnerId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    pub start: NaiveDateTime,
    #[serde(default)]
    pub end: Option<NaiveDateTime>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_rule: Option<String>,
    #[serde(default)]
    pub recur_until: Option<NaiveDateTime>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub alarms: Vec<Alarm>,
    /// Soft-delete marker kept by the store; deleted templates never reach a view.
    #[serde(default)]
    pub deleted: bool,
}

/// One materialized instance of a recurring template. Lives for a single query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub template_id: TemplateId,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    pub virtual_id: VirtualId,
}

impl Template {
    /// `end - start`, when the template has an end.
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end - self.start)
    }

    /// Whether a non-blank rule string is attached.
    pub fn has_rule(&self) -> bool {
        self.recurrence_rule
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty())
    }

    /// Alarm firing times, computed from the template's own start.
    ///
    /// For a recurring template these are NOT re-derived per occurrence: the alarms
    /// fire relative to the first instance only. An alarm whose lead time reaches
    /// past the earliest representable timestamp is dropped.
    pub fn alarm_times(&self) -> Vec<NaiveDateTime> {
        self.alarms
            .iter()
            .filter_map(|alarm| self.start.checked_sub_signed(alarm.lead_time()))
            .collect()
    }

    /// Materialize this template's occurrences inside `[range_start, range_end]`.
    ///
    /// The range is clipped to `recur_until` when set, and every occurrence keeps the
    /// template's duration. Non-recurring templates produce nothing.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidRule` if the template is flagged recurring but its
    /// rule is missing or does not parse, and `EngineError::Expansion` if an
    /// occurrence's end would fall outside the representable range.
    pub fn occurrences(
        &self,
        range_start: NaiveDateTime,
        range_end: NaiveDateTime,
        max_instances: usize,
    ) -> Result<Expansion<Occurrence>> {
        if !self.is_recurring {
            return Ok(Expansion::default());
        }
        let rule = self
            .recurrence_rule
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .ok_or(EngineError::InvalidRule(RuleError::Empty))?;

        let range_end = match self.recur_until {
            Some(until) => range_end.min(until),
            None => range_end,
        };

        let duration = self.duration();
        let expansion =
            expander::expand_occurrences(rule, self.start, range_start, range_end, max_instances)?;

        expansion.try_map(|start| {
            let end = match duration {
                Some(d) => Some(start.checked_add_signed(d).ok_or_else(|| {
                    EngineError::Expansion(format!("occurrence end out of range for start {start}"))
                })?),
                None => None,
            };
            Ok(Occurrence {
                template_id: self.id,
                start,
                end,
                virtual_id: VirtualId::new(self.id, start),
            })
        })
    }
}
