//! Error types for artifact protocol values

use std::fmt;

use thiserror::Error;

/// A single violated schema constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path of the offending value (e.g. `props.fields[0].options`)
    pub path: String,

    /// Human-readable description of the violated constraint
    pub message: String,
}

impl Violation {
    /// Create a new violation
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Schema validation failure
///
/// Lists every constraint the input violated, not only the first one found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    /// All violations, in the order they were discovered
    pub violations: Vec<Violation>,
}

impl ValidationError {
    /// Create a validation error from a list of violations
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Create a validation error holding one violation
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![Violation::new(path, message)])
    }

    /// Turn a (possibly empty) list of violations into a result
    pub(crate) fn check(violations: Vec<Violation>) -> Result<(), Self> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Self::new(violations))
        }
    }

    /// Check whether any violation is reported for the given path
    pub fn has_violation_at(&self, path: &str) -> bool {
        self.violations.iter().any(|v| v.path == path)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid artifact")?;
        for (i, violation) in self.violations.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{violation}")?;
        }
        Ok(())
    }
}

/// A user reply that cannot be turned into a form response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormResponseError {
    /// The reply is not valid JSON
    #[error("response is not valid JSON: {0}")]
    NotJson(String),

    /// The reply is JSON but not an object
    #[error("response must be a JSON object")]
    NotAnObject,

    /// Required fields were neither supplied nor defaulted
    #[error("missing required fields: {}", .0.join(", "))]
    MissingRequired(Vec<String>),
}
