//! In-memory [`TemplateSource`] over a snapshot of templates and categories.
//!
//! Applies the same filters the persistence layer does: owner match, soft-deleted
//! templates hidden, recurring and non-recurring templates listed separately,
//! results ordered by start.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::calendar::TemplateSource;
use crate::model::{CategoryId, OwnerId, Template};
use crate::window::Window;

/// A user-defined label attached to templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// Templates and categories held in memory, usually loaded from a JSON snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryTemplates {
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl InMemoryTemplates {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot from `{"templates": [...], "categories": [...]}`.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Add a template to the snapshot.
    pub fn insert(&mut self, template: Template) {
        self.templates.push(template);
    }

    /// Add a category to the snapshot.
    pub fn insert_category(&mut self, category: Category) {
        self.categories.push(category);
    }

    fn visible(&self, owner: OwnerId) -> impl Iterator<Item = &Template> {
        self.templates
            .iter()
            .filter(move |t| t.owner_id == owner && !t.deleted)
    }
}

impl TemplateSource for InMemoryTemplates {
    fn list_non_recurring(
        &self,
        owner: OwnerId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Vec<Template> {
        let window = Window { start, end };
        let mut found: Vec<Template> = self
            .visible(owner)
            .filter(|t| !t.is_recurring && window.overlaps(t.start, t.end))
            .cloned()
            .collect();
        found.sort_by_key(|t| (t.start, t.id));
        found
    }

    fn list_recurring(&self, owner: OwnerId, before_or_at: NaiveDateTime) -> Vec<Template> {
        let mut found: Vec<Template> = self
            .visible(owner)
            .filter(|t| t.is_recurring && t.start <= before_or_at)
            .cloned()
            .collect();
        found.sort_by_key(|t| (t.start, t.id));
        found
    }

    fn category_name(&self, id: CategoryId) -> Option<String> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
    }
}
