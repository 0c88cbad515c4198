//! Identities for calendar items.
//!
//! A stored template is addressed by its [`TemplateId`]. Each materialized occurrence
//! of a recurring template additionally gets a [`VirtualId`]: the pair of template id
//! and the occurrence's start as epoch seconds. Both halves are kept as typed fields,
//! so nobody has to parse a formatted string to get them back.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::model::TemplateId;

/// Identity of one occurrence of a recurring template. Never persisted.
///
/// The same `(template, start)` pair always yields the same value. Occurrences of
/// different templates never compare equal, even when they share a start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VirtualId {
    pub template_id: TemplateId,
    /// Occurrence start in seconds since the Unix epoch, wall clock read as UTC.
    pub occurrence_epoch: i64,
}

impl VirtualId {
    /// Derive the id of the occurrence of `template_id` starting at `occurrence_start`.
    pub fn new(template_id: TemplateId, occurrence_start: NaiveDateTime) -> Self {
        Self {
            template_id,
            occurrence_epoch: occurrence_start.and_utc().timestamp(),
        }
    }

    /// The occurrence start this id was derived from.
    pub fn occurrence_start(&self) -> Option<NaiveDateTime> {
        DateTime::from_timestamp(self.occurrence_epoch, 0).map(|dt| dt.naive_utc())
    }
}

/// Tagged identity of anything shown in a calendar view.
///
/// Serializes as `{"kind":"base","template_id":7}` or
/// `{"kind":"occurrence","template_id":7,"occurrence_epoch":1704099600}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventIdentity {
    Base {
        template_id: TemplateId,
    },
    Occurrence {
        template_id: TemplateId,
        occurrence_epoch: i64,
    },
}

impl EventIdentity {
    /// The template that detail, update and delete requests must address.
    ///
    /// Single occurrences cannot be edited or cancelled on their own; every
    /// mutation goes to the whole series.
    pub fn template_id(&self) -> TemplateId {
        match *self {
            EventIdentity::Base { template_id } => template_id,
            EventIdentity::Occurrence { template_id, .. } => template_id,
        }
    }

    /// The occurrence id, or `None` for a base template.
    pub fn virtual_id(&self) -> Option<VirtualId> {
        match *self {
            EventIdentity::Base { .. } => None,
            EventIdentity::Occurrence {
                template_id,
                occurrence_epoch,
            } => Some(VirtualId {
                template_id,
                occurrence_epoch,
            }),
        }
    }
}

impl From<VirtualId> for EventIdentity {
    fn from(id: VirtualId) -> Self {
        EventIdentity::Occurrence {
            template_id: id.template_id,
            occurrence_epoch: id.occurrence_epoch,
        }
    }
}
