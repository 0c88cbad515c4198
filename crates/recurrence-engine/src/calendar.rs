//! Calendar views -- merges plain events with materialized occurrences of recurring
//! templates into one sorted, uniquely addressable list.
//!
//! The aggregator holds no state of its own. Each call reads one snapshot from the
//! [`TemplateSource`] and recomputes everything, so repeated calls over unchanged
//! templates return identical items in identical order.
//!
//! Items are ordered by start time. Items sharing a start put plain events before
//! occurrences, then order by template id, then by occurrence epoch.

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::identity::{EventIdentity, VirtualId};
use crate::model::{CategoryId, Occurrence, OwnerId, Template, TemplateId};
use crate::window::Window;

/// Read access to stored templates, provided by the persistence layer.
pub trait TemplateSource {
    /// Non-recurring templates of `owner` overlapping `[start, end]`.
    fn list_non_recurring(
        &self,
        owner: OwnerId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Vec<Template>;

    /// Recurring templates of `owner` anchored at or before `before_or_at`.
    fn list_recurring(&self, owner: OwnerId, before_or_at: NaiveDateTime) -> Vec<Template>;

    /// Display name of a category. Used for labels only.
    fn category_name(&self, id: CategoryId) -> Option<String>;
}

/// One entry of a calendar view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarItem {
    pub source_template_id: TemplateId,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    pub all_day: bool,
    pub color: Option<String>,
    pub is_recurring: bool,
    pub category_name: Option<String>,
    /// `None` for plain events.
    pub virtual_id: Option<VirtualId>,
}

impl CalendarItem {
    fn from_template(template: &Template, category_name: Option<String>) -> Self {
        Self {
            source_template_id: template.id,
            title: template.title.clone(),
            start: template.start,
            end: template.end,
            all_day: template.all_day,
            color: template.color.clone(),
            is_recurring: template.is_recurring,
            category_name,
            virtual_id: None,
        }
    }

    fn from_occurrence(
        template: &Template,
        occurrence: &Occurrence,
        category_name: Option<String>,
    ) -> Self {
        Self {
            start: occurrence.start,
            end: occurrence.end,
            is_recurring: true,
            virtual_id: Some(occurrence.virtual_id),
            ..Self::from_template(template, category_name)
        }
    }

    /// The item's tagged identity: `Base` for plain events, `Occurrence` otherwise.
    pub fn identity(&self) -> EventIdentity {
        match self.virtual_id {
            Some(id) => id.into(),
            None => EventIdentity::Base {
                template_id: self.source_template_id,
            },
        }
    }

    fn view_order(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| self.virtual_id.is_some().cmp(&other.virtual_id.is_some()))
            .then_with(|| self.source_template_id.cmp(&other.source_template_id))
            .then_with(|| self.virtual_id.cmp(&other.virtual_id))
    }
}

/// Something a caller may want to know about how a view was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A template flagged recurring contributed nothing because its rule was rejected.
    RuleRejected {
        template_id: TemplateId,
        reason: String,
    },
    /// A template hit the per-template instance cap; its occurrences are clipped.
    Truncated {
        template_id: TemplateId,
        limit: usize,
    },
}

/// A computed calendar view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarView {
    pub window: Window,
    pub items: Vec<CalendarItem>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CalendarView {
    /// Whether any template hit its instance cap while building this view.
    pub fn is_truncated(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::Truncated { .. }))
    }

    /// Drop the diagnostics and keep the ordered items.
    pub fn into_items(self) -> Vec<CalendarItem> {
        self.items
    }
}

/// Builds calendar views from a [`TemplateSource`].
pub struct CalendarAggregator<'a, S: TemplateSource + ?Sized> {
    source: &'a S,
    config: EngineConfig,
}

impl<'a, S: TemplateSource + ?Sized> CalendarAggregator<'a, S> {
    /// Aggregator with the default limits.
    pub fn new(source: &'a S) -> Self {
        Self::with_config(source, EngineConfig::default())
    }

    /// Aggregator with explicit limits.
    pub fn with_config(source: &'a S, config: EngineConfig) -> Self {
        Self { source, config }
    }

    /// The limits this aggregator applies.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Everything `owner` has in the given calendar month.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidMonth` for an impossible year/month.
    pub fn monthly_view(&self, owner: OwnerId, year: i32, month: u32) -> Result<CalendarView> {
        let window = Window::month(year, month)?;
        Ok(self.build(owner, window, self.config.monthly_max_instances))
    }

    /// Everything `owner` has in `[start, end]`.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidWindow` if `start` is after `end`.
    pub fn range_view(
        &self,
        owner: OwnerId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<CalendarView> {
        let window = Window::new(start, end)?;
        Ok(self.build(owner, window, self.config.range_max_instances))
    }

    fn build(&self, owner: OwnerId, window: Window, max_instances: usize) -> CalendarView {
        let mut items = Vec::new();
        let mut diagnostics = Vec::new();

        for template in self
            .source
            .list_non_recurring(owner, window.start, window.end)
        {
            let category = self.category_label(&template);
            items.push(CalendarItem::from_template(&template, category));
        }

        for template in self.source.list_recurring(owner, window.end) {
            let expansion = match template.occurrences(window.start, window.end, max_instances)
            {
                Ok(expansion) => expansion,
                Err(e) => {
                    tracing::warn!(
                        template_id = %template.id,
                        rule = ?template.recurrence_rule,
                        error = %e,
                        "recurring template contributes no occurrences"
                    );
                    diagnostics.push(Diagnostic::RuleRejected {
                        template_id: template.id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            tracing::debug!(
                template_id = %template.id,
                count = expansion.items.len(),
                "expanded recurring template"
            );
            if expansion.truncated {
                tracing::warn!(
                    template_id = %template.id,
                    limit = max_instances,
                    "occurrence cap reached before end of window"
                );
                diagnostics.push(Diagnostic::Truncated {
                    template_id: template.id,
                    limit: max_instances,
                });
            }

            let category = self.category_label(&template);
            items.extend(
                expansion
                    .items
                    .iter()
                    .map(|occ| CalendarItem::from_occurrence(&template, occ, category.clone())),
            );
        }

        items.sort_by(CalendarItem::view_order);

        CalendarView {
            window,
            items,
            diagnostics,
        }
    }

    fn category_label(&self, template: &Template) -> Option<String> {
        template
            .category_id
            .and_then(|id| self.source.category_name(id))
    }
}
