//! Input validation for task and project creation.

use std::fmt;

use crate::models::{NewProject, NewTask};

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required fields absent or blank, in declaration order.
    MissingFields(Vec<&'static str>),
    /// Project color that is not `#rgb` or `#rrggbb`.
    InvalidColor(String),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingFields(fields) => {
                write!(f, "Missing required fields: {}", fields.join(", "))
            }
            ValidationError::InvalidColor(color) => {
                write!(f, "Invalid color '{}': expected a hex value like #5e6ad2", color)
            }
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for task and project titles.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum allowed length for a single task note.
pub const MAX_NOTE_LENGTH: usize = 4000;

/// Collect the names of blank required fields.
///
/// `fields` pairs each wire name with its raw value; absent and
/// whitespace-only values both count as missing.
pub fn require_fields(fields: &[(&'static str, Option<&str>)]) -> Result<(), ValidationError> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingFields(missing))
    }
}

/// Validate a hex color (`#rgb` or `#rrggbb`).
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    let color = color.trim();

    if color.is_empty() {
        return Err(ValidationError::Empty("color".to_string()));
    }

    let Some(hex) = color.strip_prefix('#') else {
        return Err(ValidationError::InvalidColor(color.to_string()));
    };

    if !matches!(hex.len(), 3 | 6) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidColor(color.to_string()));
    }

    Ok(())
}

fn validate_length(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
            actual,
        });
    }
    Ok(())
}

/// Validate a task title.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let title = title.trim();

    if title.is_empty() {
        return Err(ValidationError::Empty("title".to_string()));
    }

    validate_length("title", title, MAX_TITLE_LENGTH)
}

/// Validate a note before it is appended.
pub fn validate_note(note: &str) -> Result<(), ValidationError> {
    if note.trim().is_empty() {
        return Err(ValidationError::Empty("note".to_string()));
    }

    validate_length("note", note, MAX_NOTE_LENGTH)
}

/// Validate a fully-populated task creation request.
pub fn validate_new_task(task: &NewTask) -> Result<(), ValidationError> {
    require_fields(&[
        ("title", Some(task.title.as_str())),
        ("assignee", Some(task.assignee.as_str())),
        ("createdBy", Some(task.created_by.as_str())),
    ])?;
    validate_title(&task.title)
}

/// Validate a project creation request.
pub fn validate_new_project(project: &NewProject) -> Result<(), ValidationError> {
    require_fields(&[
        ("projectId", Some(project.project_id.as_str())),
        ("name", Some(project.name.as_str())),
        ("color", Some(project.color.as_str())),
    ])?;
    validate_length("name", project.name.trim(), MAX_TITLE_LENGTH)?;
    validate_color(&project.color)
}
