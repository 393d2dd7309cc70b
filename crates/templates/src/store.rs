//! Template store with selection invariant maintenance.

use crate::error::{Result, TemplateError};
use crate::{normalize_selection, MessageTemplate, TemplateRepository};

/// Id of the built-in template returned when nothing usable is persisted.
pub const DEFAULT_TEMPLATE_ID: &str = "default";

/// Text of the built-in template.
pub const DEFAULT_TEMPLATE_TEXT: &str =
    "Sorry, I can't answer right now. I'll call you back as soon as I can.";

fn default_template() -> MessageTemplate {
    MessageTemplate {
        id: DEFAULT_TEMPLATE_ID.to_string(),
        text: DEFAULT_TEMPLATE_TEXT.to_string(),
        is_selected: true,
    }
}

fn repository_error<E>(e: E) -> TemplateError
where
    E: std::error::Error + Send + Sync + 'static,
{
    TemplateError::Repository(Box::new(e))
}

pub struct TemplateStore<R> {
    repo: R,
}

impl<R: TemplateRepository> TemplateStore<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Persisted entries with the selection invariant repaired.
    ///
    /// Unreadable data is treated as empty. A repaired selection is written
    /// back so later readers agree on the active template.
    fn persisted(&self) -> Vec<MessageTemplate> {
        let mut templates = match self.repo.load_templates() {
            Ok(templates) => templates,
            Err(e) => {
                tracing::warn!(error = %e, "stored templates unreadable, using defaults");
                return Vec::new();
            }
        };

        if normalize_selection(&mut templates) {
            tracing::info!(count = templates.len(), "repaired template selection");
            if let Err(e) = self.repo.save_templates(&templates) {
                tracing::warn!(error = %e, "failed to persist repaired selection");
            }
        }
        templates
    }

    fn save(&self, mut templates: Vec<MessageTemplate>) -> Result<()> {
        normalize_selection(&mut templates);
        self.repo.save_templates(&templates).map_err(repository_error)
    }

    /// All templates, or the built-in default when none are stored.
    pub fn list(&self) -> Vec<MessageTemplate> {
        let templates = self.persisted();
        if templates.is_empty() {
            vec![default_template()]
        } else {
            templates
        }
    }

    /// Append a template. It becomes the active one if the store was empty.
    pub fn add(&self, text: &str) -> Result<MessageTemplate> {
        let text = validate(text)?;
        let mut templates = self.persisted();

        let mut template = MessageTemplate::new(text);
        template.is_selected = templates.is_empty();
        templates.push(template.clone());

        self.save(templates)?;
        tracing::debug!(id = %template.id, selected = template.is_selected, "template added");
        Ok(template)
    }

    /// Replace a template's text, keeping its selection state.
    pub fn update(&self, id: &str, text: &str) -> Result<()> {
        let text = validate(text)?;
        let mut templates = self.persisted();

        let template = templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
        template.text = text.to_string();

        self.save(templates)?;
        tracing::debug!(id, "template updated");
        Ok(())
    }

    /// Remove a template. Deleting the active one promotes the first remaining.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut templates = self.persisted();
        let before = templates.len();
        templates.retain(|t| t.id != id);
        if templates.len() == before {
            return Err(TemplateError::NotFound(id.to_string()));
        }

        self.save(templates)?;
        tracing::debug!(id, "template deleted");
        Ok(())
    }

    /// Make `id` the only selected template.
    pub fn select(&self, id: &str) -> Result<()> {
        let mut templates = self.persisted();
        if !templates.iter().any(|t| t.id == id) {
            return Err(TemplateError::NotFound(id.to_string()));
        }

        for template in &mut templates {
            template.is_selected = template.id == id;
        }

        self.save(templates)?;
        tracing::debug!(id, "template selected");
        Ok(())
    }

    pub fn selected(&self) -> MessageTemplate {
        self.list()
            .into_iter()
            .find(|t| t.is_selected)
            .unwrap_or_else(default_template)
    }

    /// Text of the active template.
    pub fn selected_text(&self) -> String {
        self.selected().text
    }
}

fn validate(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TemplateError::EmptyText);
    }
    Ok(trimmed)
}
