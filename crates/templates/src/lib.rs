//! Reply templates for missed-call auto-replies.
//!
//! The collection always has exactly one selected template when it is
//! non-empty. [`TemplateStore`] enforces that on every read and write and
//! falls back to a built-in default when nothing usable is persisted.

mod error;
mod store;

pub use error::{Result, TemplateError};
pub use store::{TemplateStore, DEFAULT_TEMPLATE_ID, DEFAULT_TEMPLATE_TEXT};

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

/// A single reply template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
    pub id: String,
    pub text: String,
    pub is_selected: bool,
}

impl MessageTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            is_selected: false,
        }
    }
}

/// Repository trait for template persistence.
/// Implemented by the storage layer, keeping the store logic decoupled.
pub trait TemplateRepository: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the persisted templates. Empty when nothing has been stored.
    fn load_templates(&self) -> std::result::Result<Vec<MessageTemplate>, Self::Error>;

    /// Replace the persisted templates.
    fn save_templates(&self, templates: &[MessageTemplate]) -> std::result::Result<(), Self::Error>;
}

impl<T: TemplateRepository + ?Sized> TemplateRepository for std::sync::Arc<T> {
    type Error = T::Error;

    fn load_templates(&self) -> std::result::Result<Vec<MessageTemplate>, Self::Error> {
        (**self).load_templates()
    }

    fn save_templates(&self, templates: &[MessageTemplate]) -> std::result::Result<(), Self::Error> {
        (**self).save_templates(templates)
    }
}

/// Make `templates` have exactly one selected entry when non-empty.
///
/// The first selected entry wins; if none is selected the first entry is.
/// Returns `true` if anything was changed.
pub fn normalize_selection(templates: &mut [MessageTemplate]) -> bool {
    if templates.is_empty() {
        return false;
    }
    let keep = templates.iter().position(|t| t.is_selected).unwrap_or(0);

    let mut changed = false;
    for (i, template) in templates.iter_mut().enumerate() {
        let selected = i == keep;
        if template.is_selected != selected {
            template.is_selected = selected;
            changed = true;
        }
    }
    changed
}

/// In-memory repository for tests and headless use.
#[derive(Default)]
pub struct InMemoryTemplates {
    templates: Mutex<Vec<MessageTemplate>>,
}

impl InMemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with raw entries, bypassing selection repair.
    pub fn with_templates(templates: Vec<MessageTemplate>) -> Self {
        Self {
            templates: Mutex::new(templates),
        }
    }

    pub fn raw(&self) -> Vec<MessageTemplate> {
        self.templates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl TemplateRepository for InMemoryTemplates {
    type Error = std::convert::Infallible;

    fn load_templates(&self) -> std::result::Result<Vec<MessageTemplate>, Self::Error> {
        Ok(self.raw())
    }

    fn save_templates(&self, templates: &[MessageTemplate]) -> std::result::Result<(), Self::Error> {
        *self
            .templates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = templates.to_vec();
        Ok(())
    }
}
