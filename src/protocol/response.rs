//! Replies to artifact interactions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A user's reply to an artifact, e.g. a submitted form
///
/// `artifact_id` is a back-reference for the producer's own correlation; it
/// is not checked against any registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ArtifactResponse {
    /// ID of the artifact being responded to
    pub artifact_id: String,

    /// Action taken ("submit", "cancel", ...)
    pub action: String,

    /// User-provided data keyed by field name
    #[serde(default)]
    pub data: Map<String, Value>,

    /// When the response was produced
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ArtifactResponse {
    /// Create a response with an arbitrary action
    pub fn new(
        artifact_id: impl Into<String>,
        action: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            artifact_id: artifact_id.into(),
            action: action.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    /// Create a submit response
    pub fn submit(artifact_id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self::new(artifact_id, "submit", data)
    }

    /// Create a cancel response with no data
    pub fn cancel(artifact_id: impl Into<String>) -> Self {
        Self::new(artifact_id, "cancel", Map::new())
    }

    /// Check whether this response submits data
    pub fn is_submit(&self) -> bool {
        self.action == "submit"
    }
}
