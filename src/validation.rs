use serde::Serialize;
use std::fmt;

/// Default upper bound on script content, in characters.
pub const MAX_CONTENT_CHARS: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorKind {
    MissingField,
    TooLarge { actual: usize, max: usize },
}

/// A single rule violation for one submitted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    #[serde(flatten)]
    pub kind: ValidationErrorKind,
}

impl FieldError {
    pub fn missing(field: &'static str) -> Self {
        Self {
            field,
            kind: ValidationErrorKind::MissingField,
        }
    }

    pub fn too_large(field: &'static str, actual: usize, max: usize) -> Self {
        Self {
            field,
            kind: ValidationErrorKind::TooLarge { actual, max },
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValidationErrorKind::MissingField => write!(f, "{} is required", self.field),
            ValidationErrorKind::TooLarge { actual, max } => {
                write!(f, "{} too large: {} > {} characters", self.field, actual, max)
            }
        }
    }
}

/// Borrowed view of the fields a caller submits for create or update.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptInput<'a> {
    pub content: Option<&'a str>,
    pub owner: Option<&'a str>,
    pub filename: Option<&'a str>,
    pub description: Option<&'a str>,
}

/// Checks submitted script fields. Every rule is evaluated so callers get
/// the full list of violations in one response.
#[derive(Debug, Clone)]
pub struct ScriptValidator {
    max_content_chars: usize,
}

impl Default for ScriptValidator {
    fn default() -> Self {
        Self::new(MAX_CONTENT_CHARS)
    }
}

impl ScriptValidator {
    pub fn new(max_content_chars: usize) -> Self {
        Self { max_content_chars }
    }

    /// Returns an empty list when the input is acceptable. Input is not trimmed.
    pub fn validate(&self, input: &ScriptInput<'_>) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if is_blank(input.content) {
            errors.push(FieldError::missing("content"));
        }
        if is_blank(input.owner) {
            errors.push(FieldError::missing("owner"));
        }
        if let Some(content) = input.content {
            let chars = content.chars().count();
            if chars > self.max_content_chars {
                errors.push(FieldError::too_large("content", chars, self.max_content_chars));
            }
        }

        errors
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
