//! Query windows.
//!
//! A window is an inclusive `[start, end]` range of wall-clock timestamps. A calendar
//! month runs from the 1st at 00:00:00 to the last day at 23:59:59.

use chrono::{Duration, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// An inclusive `[start, end]` query range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// First instant inside the window.
    pub start: NaiveDateTime,
    /// Last instant inside the window.
    pub end: NaiveDateTime,
}

impl Window {
    /// Build a window, rejecting inverted bounds. `start == end` is a single instant.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidWindow` if `start` is after `end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start > end {
            return Err(EngineError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// The window covering one calendar month.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidMonth` if the month is outside 1..=12 or the year
    /// is outside chrono's supported range.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let invalid = || EngineError::InvalidMonth { year, month };
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let start = first.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.checked_sub_signed(Duration::seconds(1)))
            .ok_or_else(invalid)?;
        Ok(Self { start, end })
    }

    /// Whether `t` lies inside the window, bounds included.
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }

    /// Three-way overlap test for a plain event: it starts inside the window, ends
    /// inside the window, or spans the whole window. An event without an end only
    /// overlaps when it starts inside.
    pub fn overlaps(&self, start: NaiveDateTime, end: Option<NaiveDateTime>) -> bool {
        if self.contains(start) {
            return true;
        }
        match end {
            Some(end) => self.contains(end) || (start <= self.start && end >= self.end),
            None => false,
        }
    }
}
