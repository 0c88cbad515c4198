//! # recurrence-engine
//!
//! Deterministic recurring-event materialization for calendar views.
//!
//! Stored event templates may carry a recurrence rule. This crate validates those
//! rules, expands them into concrete occurrence times inside a bounded window, and
//! merges the occurrences with plain events into a sorted list where every item has
//! a stable identity. It wraps the `rrule` crate for the date arithmetic.
//!
//! Everything here is a pure function of its inputs: no I/O, no clock, no shared
//! mutable state. Persistence sits behind the [`TemplateSource`] trait.
//!
//! ## Modules
//!
//! - [`rule`]: rule grammar, parser and validator
//! - [`expander`]: rule + anchor + window → occurrence start times
//! - [`calendar`]: month and range views over a [`TemplateSource`]
//! - [`identity`]: virtual ids for occurrences, tagged item identities
//! - [`model`]: templates, alarms, occurrences
//! - [`window`]: inclusive query windows and the overlap test
//! - [`store`]: in-memory [`TemplateSource`] over a snapshot
//! - [`config`]: expansion limits
//! - [`error`]: Error types

pub mod calendar;
pub mod config;
pub mod error;
pub mod expander;
pub mod identity;
pub mod model;
pub mod rule;
pub mod store;
pub mod window;

pub use calendar::{CalendarAggregator, CalendarItem, CalendarView, Diagnostic, TemplateSource};
pub use config::EngineConfig;
pub use error::EngineError;
pub use expander::{
    expand_occurrences, generate, generate_monthly, next_occurrence, next_occurrence_with,
    Expansion,
};
pub use identity::{EventIdentity, VirtualId};
pub use model::{Alarm, AlarmUnit, CategoryId, Occurrence, OwnerId, Template, TemplateId};
pub use rule::{is_valid_rule, RecurrenceRule, RuleError};
pub use store::{Category, InMemoryTemplates};
pub use window::Window;
