use serde::Serialize;
use std::fmt;

/// One field-level validation failure.
///
/// `path` is a JSON pointer into the validated value (`/email`,
/// `/items/0/id`); it is empty when the failure concerns the value itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        FieldIssue {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Validation failure produced by a [`super::SchemaAdapter`].
///
/// Serializes as the bare issue array, which is the detail placed under
/// `error` in a 400 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationError {
    issues: Vec<FieldIssue>,
}

impl ValidationError {
    #[must_use]
    pub fn new(issues: Vec<FieldIssue>) -> Self {
        ValidationError { issues }
    }

    /// Single issue at the root of the value.
    pub fn root(message: impl Into<String>) -> Self {
        ValidationError {
            issues: vec![FieldIssue::new("", message)],
        }
    }

    #[must_use]
    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    #[must_use]
    pub fn into_issues(self) -> Vec<FieldIssue> {
        self.issues
    }

    /// Merge the issues of `other` into `self`.
    pub fn extend(&mut self, other: ValidationError) {
        self.issues.extend(other.issues);
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for issue in &self.issues {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// A schema document could not be turned into a validator.
///
/// Raised at construction time, before any route is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The document is not a valid JSON Schema.
    Invalid { reason: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Invalid { reason } => write!(f, "invalid schema: {reason}"),
        }
    }
}

impl std::error::Error for SchemaError {}
