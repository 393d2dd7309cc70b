//! Error types for template management.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template text was empty or whitespace only.
    #[error("template text must not be blank")]
    EmptyText,

    /// No template with the given id exists.
    #[error("template not found: {0}")]
    NotFound(String),

    /// The backing repository failed to persist the templates.
    #[error("template repository error: {0}")]
    Repository(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, TemplateError>;
