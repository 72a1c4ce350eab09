//! Extraction of artifacts from accumulated agent output
//!
//! [`extract`] is a pure function over the text received so far. It is meant
//! to be called again on every incremental delta; all state (the accumulated
//! text) belongs to the caller.

mod scanner;

use serde_json::Value;
use thiserror::Error;

use crate::protocol::{error::ValidationError, Artifact};

/// Why an embedded artifact could not be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The candidate span is not valid JSON
    #[error("artifact is not valid JSON: {0}")]
    Syntax(String),

    /// The candidate is JSON but violates the artifact schema
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The object was still open when the output ended
    #[error("artifact object is not terminated")]
    Unterminated,
}

/// Outcome of scanning text for an artifact
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A valid artifact was found
    Found(Artifact),

    /// The text carries no artifact candidate
    NotPresent,

    /// A candidate object has started but not closed yet
    Incomplete,

    /// A candidate was found but cannot be used
    Malformed(ExtractError),
}

impl Extraction {
    /// The found artifact, if any
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            Extraction::Found(artifact) => Some(artifact),
            _ => None,
        }
    }

    /// Consume the extraction, keeping only a found artifact
    pub fn into_artifact(self) -> Option<Artifact> {
        match self {
            Extraction::Found(artifact) => Some(artifact),
            _ => None,
        }
    }

    /// Check if an artifact was found
    pub fn is_found(&self) -> bool {
        matches!(self, Extraction::Found(_))
    }
}

/// Find and decode the first artifact embedded in `text`
///
/// Returns [`Extraction::Incomplete`] when an artifact object has opened but
/// not yet closed, so callers can retry once more text arrives.
pub fn extract(text: &str) -> Extraction {
    if !scanner::mentions_artifact(text) {
        return Extraction::NotPresent;
    }

    let Some(start) = scanner::candidate_start(text) else {
        return Extraction::NotPresent;
    };
    let Some(end) = scanner::object_end(text, start) else {
        return Extraction::Incomplete;
    };

    let value: Value = match serde_json::from_str(&text[start..end]) {
        Ok(value) => value,
        Err(e) => return Extraction::Malformed(ExtractError::Syntax(e.to_string())),
    };

    match Artifact::from_value(value) {
        Ok(artifact) => Extraction::Found(artifact),
        Err(e) => Extraction::Malformed(e.into()),
    }
}

/// Like [`extract`], for text that will not grow any further
///
/// An unterminated candidate is reported as malformed instead of incomplete.
pub fn extract_final(text: &str) -> Extraction {
    match extract(text) {
        Extraction::Incomplete => Extraction::Malformed(ExtractError::Unterminated),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ComponentKind;

    const FORM_JSON: &str = r#"{"kind":"artifact","id":"f1","component":"form","props":{"title":"Confirm","fields":[{"name":"ok","type":"checkbox","label":"OK"}]}}"#;

    #[test]
    fn test_not_present() {
        assert_eq!(extract(""), Extraction::NotPresent);
        assert_eq!(extract("no artifact here"), Extraction::NotPresent);
        assert_eq!(extract("just prose"), Extraction::NotPresent);
    }

    #[test]
    fn test_found_between_prose() {
        let text = format!("Here is a form:\n{FORM_JSON}\nPlease fill it in.");
        let artifact = extract(&text).into_artifact().unwrap();

        assert_eq!(artifact.id, "f1");
        assert_eq!(artifact.component(), ComponentKind::Form);
    }

    #[test]
    fn test_extract_is_pure() {
        let text = format!("prefix {FORM_JSON} suffix");
        assert_eq!(extract(&text), extract(&text));
    }

    #[test]
    fn test_incomplete_then_found() {
        let cut = FORM_JSON.len() - 1;
        assert_eq!(extract(&FORM_JSON[..cut]), Extraction::Incomplete);
        assert!(extract(FORM_JSON).is_found());
    }

    #[test]
    fn test_malformed_json() {
        let text = r#"{"kind":"artifact","id":"x",,}"#;
        assert!(matches!(
            extract(text),
            Extraction::Malformed(ExtractError::Syntax(_))
        ));
    }

    #[test]
    fn test_single_quoted_candidate_is_malformed() {
        let text = "{'kind': 'artifact', 'id': 'x'}";
        assert!(matches!(
            extract(text),
            Extraction::Malformed(ExtractError::Syntax(_))
        ));
    }

    #[test]
    fn test_schema_violation_is_malformed() {
        let text = r#"{"kind":"artifact","id":"x","component":"form","props":{"title":"T","fields":[]}}"#;
        match extract(text) {
            Extraction::Malformed(ExtractError::Invalid(err)) => {
                assert!(err.has_violation_at("props.fields"));
            }
            other => panic!("expected invalid artifact, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_final_unterminated() {
        let text = r#"Result: {"kind":"artifact","component":"form""#;
        assert_eq!(extract(text), Extraction::Incomplete);
        assert_eq!(
            extract_final(text),
            Extraction::Malformed(ExtractError::Unterminated)
        );
    }

    #[test]
    fn test_other_typed_object_before_artifact() {
        let text = format!(r#"Search returned {{"type":"result","hits":3}}. Now: {FORM_JSON}"#);
        let artifact = extract(&text).into_artifact().unwrap();
        assert_eq!(artifact.id, "f1");

        let prose_only = r#"Search returned {"type":"result","hits":3} as an artifact"#;
        assert_eq!(extract(prose_only), Extraction::NotPresent);
    }

    #[test]
    fn test_brace_in_string_value() {
        let text = r#"{"kind":"artifact","id":"md","component":"markdown","props":{"content":"use } and { freely"}} done"#;
        let artifact = extract(text).into_artifact().unwrap();
        assert_eq!(artifact.id, "md");
    }
}
