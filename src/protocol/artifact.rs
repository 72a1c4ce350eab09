//! Artifacts: structured UI directives embedded in agent output

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{ser::SerializeStruct, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::{
    error::{ValidationError, Violation},
    form::FormProps,
    schema::{self, ARTIFACT_KIND, KIND_KEY},
};

/// Rendering variant of an artifact
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Interactive form
    Form,

    /// Markdown report
    Markdown,

    /// Data visualization (reserved, not rendered)
    Chart,

    /// Code viewer/editor (reserved, not rendered)
    CodeSandbox,
}

impl ComponentKind {
    /// All component kinds, in wire order
    pub const ALL: [ComponentKind; 4] = [
        ComponentKind::Form,
        ComponentKind::Markdown,
        ComponentKind::Chart,
        ComponentKind::CodeSandbox,
    ];

    /// Wire name of the component
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Form => "form",
            ComponentKind::Markdown => "markdown",
            ComponentKind::Chart => "chart",
            ComponentKind::CodeSandbox => "code_sandbox",
        }
    }

    /// Look up a component kind by its wire name
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Check if clients are expected to render this component
    pub fn is_renderable(&self) -> bool {
        matches!(self, ComponentKind::Form | ComponentKind::Markdown)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Markdown report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MarkdownProps {
    /// Raw markdown text
    pub content: String,
}

/// Chart payload, reserved for a later revision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChartProps {
    /// Chart type (bar, line, pie)
    pub chart_type: String,

    /// Chart data
    pub data: Map<String, Value>,

    /// Optional chart title
    #[serde(default)]
    pub title: Option<String>,
}

/// Code sandbox payload, reserved for a later revision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CodeSandboxProps {
    /// Code content
    pub code: String,

    /// Programming language
    pub language: String,

    /// Optional filename
    #[serde(default)]
    pub filename: Option<String>,

    /// Whether the code is editable
    #[serde(default)]
    pub editable: bool,
}

/// Component-specific payload of an artifact
///
/// The variant determines the artifact's `component` tag, so a payload can
/// never disagree with its tag once constructed.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ComponentProps {
    /// Form payload
    Form(FormProps),

    /// Markdown payload
    Markdown(MarkdownProps),

    /// Chart payload
    Chart(ChartProps),

    /// Code sandbox payload
    CodeSandbox(CodeSandboxProps),
}

impl ComponentProps {
    /// The component tag matching this payload
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentProps::Form(_) => ComponentKind::Form,
            ComponentProps::Markdown(_) => ComponentKind::Markdown,
            ComponentProps::Chart(_) => ComponentKind::Chart,
            ComponentProps::CodeSandbox(_) => ComponentKind::CodeSandbox,
        }
    }

    /// Decode a payload using the schema selected by `kind`
    pub fn from_value(kind: ComponentKind, value: Value) -> Result<Self, ValidationError> {
        let decoded = match kind {
            ComponentKind::Form => serde_json::from_value(value).map(ComponentProps::Form),
            ComponentKind::Markdown => serde_json::from_value(value).map(ComponentProps::Markdown),
            ComponentKind::Chart => serde_json::from_value(value).map(ComponentProps::Chart),
            ComponentKind::CodeSandbox => {
                serde_json::from_value(value).map(ComponentProps::CodeSandbox)
            }
        };

        let props = decoded.map_err(|e| ValidationError::single("props", e.to_string()))?;

        let mut violations = Vec::new();
        props.check("props", &mut violations);
        ValidationError::check(violations)?;
        Ok(props)
    }

    fn check(&self, path: &str, out: &mut Vec<Violation>) {
        if let ComponentProps::Form(form) = self {
            form.check(path, out);
        }
    }
}

/// An interactive widget emitted by an agent
///
/// Artifacts are immutable values. On the wire they look like:
///
/// ```json
/// {"kind":"artifact","id":"deploy-form","component":"form",
///  "props":{"title":"Confirm","fields":[{"name":"ok","type":"checkbox","label":"OK"}]},
///  "timestamp":"2026-02-07T16:00:00Z","metadata":{}}
/// ```
///
/// Construction from untrusted input goes through [`Artifact::from_value`],
/// which either yields a valid artifact or reports every violated constraint.
/// The [`Deserialize`] impl uses the same path.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Identifier chosen by the producer; a repeated id replaces the earlier artifact
    pub id: String,

    /// Component payload
    pub props: ComponentProps,

    /// Emission time, informational only
    pub timestamp: Option<DateTime<Utc>>,

    /// Opaque client metadata
    pub metadata: Map<String, Value>,
}

impl Artifact {
    /// Create an artifact stamped with the current time
    ///
    /// # Errors
    ///
    /// Fails if the payload violates its component's constraints
    pub fn new(id: impl Into<String>, props: ComponentProps) -> Result<Self, ValidationError> {
        let mut violations = Vec::new();
        props.check("props", &mut violations);
        ValidationError::check(violations)?;

        Ok(Self {
            id: id.into(),
            props,
            timestamp: Some(Utc::now()),
            metadata: Map::new(),
        })
    }

    /// Create a form artifact
    pub fn form(id: impl Into<String>, form: FormProps) -> Result<Self, ValidationError> {
        Self::new(id, ComponentProps::Form(form))
    }

    /// Create a markdown artifact
    pub fn markdown(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            props: ComponentProps::Markdown(MarkdownProps {
                content: content.into(),
            }),
            timestamp: Some(Utc::now()),
            metadata: Map::new(),
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Replace the timestamp
    pub fn with_timestamp(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The component tag
    pub fn component(&self) -> ComponentKind {
        self.props.kind()
    }

    /// The form payload, if this is a form
    pub fn as_form(&self) -> Option<&FormProps> {
        match &self.props {
            ComponentProps::Form(form) => Some(form),
            _ => None,
        }
    }

    /// Check if this artifact is a form
    pub fn is_form(&self) -> bool {
        self.as_form().is_some()
    }

    /// Validate and decode an artifact from a raw JSON value
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        ValidationError::check(schema::check_artifact(&value))?;

        let Value::Object(mut map) = value else {
            return Err(ValidationError::single("", "expected object"));
        };

        let id = match map.remove("id") {
            Some(Value::String(id)) => id,
            _ => return Err(ValidationError::single("id", "missing required field")),
        };
        let kind = map
            .get("component")
            .and_then(Value::as_str)
            .and_then(ComponentKind::parse)
            .ok_or_else(|| ValidationError::single("component", "unknown component"))?;
        let props = ComponentProps::from_value(kind, map.remove("props").unwrap_or(Value::Null))?;
        let timestamp = map
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(schema::parse_timestamp);
        let metadata = match map.remove("metadata") {
            Some(Value::Object(metadata)) => metadata,
            _ => Map::new(),
        };

        Ok(Self {
            id,
            props,
            timestamp,
            metadata,
        })
    }

    /// Validate and decode an artifact from JSON text
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ValidationError::single("", format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Serialize to compact JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to indented JSON
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for Artifact {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.timestamp.is_some() { 6 } else { 5 };
        let mut state = serializer.serialize_struct("Artifact", len)?;
        state.serialize_field(KIND_KEY, ARTIFACT_KIND)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("component", &self.component())?;
        state.serialize_field("props", &self.props)?;
        match &self.timestamp {
            Some(ts) => state.serialize_field("timestamp", ts)?,
            None => state.skip_field("timestamp")?,
        }
        state.serialize_field("metadata", &self.metadata)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Artifact {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Artifact::from_value(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::protocol::form::{FieldType, FormField};

    fn deploy_artifact() -> Artifact {
        let form = FormProps::new(
            "Deploy",
            vec![FormField::select("env", "Environment", ["staging", "prod"]).unwrap()],
        )
        .unwrap();
        Artifact::form("deploy-form", form).unwrap()
    }

    #[test]
    fn test_create_form_artifact() {
        let artifact = deploy_artifact();
        assert_eq!(artifact.id, "deploy-form");
        assert_eq!(artifact.component(), ComponentKind::Form);
        assert!(artifact.is_form());
        assert!(artifact.timestamp.is_some());
    }

    #[test]
    fn test_create_markdown_artifact() {
        let artifact = Artifact::markdown("md-001", "# Test");
        assert_eq!(artifact.component(), ComponentKind::Markdown);
        assert!(artifact.as_form().is_none());
    }

    #[test]
    fn test_new_rejects_invalid_form() {
        let mut form = FormProps::new("Deploy", vec![FormField::text("a", "A")]).unwrap();
        form.fields.clear();

        let err = Artifact::form("f", form).unwrap_err();
        assert!(err.has_violation_at("props.fields"));
    }

    #[test]
    fn test_serialization_field_order() {
        let artifact = Artifact::markdown("md", "hi").with_timestamp(None);
        let json = artifact.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"kind":"artifact","id":"md","component":"markdown","props":{"content":"hi"},"metadata":{}}"#
        );
    }

    #[test]
    fn test_round_trip() {
        let artifact = deploy_artifact().with_metadata("source", json!("planner"));
        let json = artifact.to_json().unwrap();
        let parsed = Artifact::from_json(&json).unwrap();
        assert_eq!(parsed, artifact);
    }

    #[test]
    fn test_deserialize_legacy_payload() {
        let artifact: Artifact = serde_json::from_value(json!({
            "type": "artifact",
            "id": "test-form",
            "component": "form",
            "props": {
                "title": "Test",
                "fields": [{
                    "name": "field1",
                    "type": "text",
                    "label": "Field 1",
                    "options": [],
                    "required": true,
                    "default": null,
                    "placeholder": null,
                    "help_text": null
                }],
                "description": null,
                "submit_label": "Submit",
                "cancel_label": null
            },
            "timestamp": "2026-02-07T16:00:00",
            "metadata": {}
        }))
        .unwrap();

        assert_eq!(artifact.id, "test-form");
        let form = artifact.as_form().unwrap();
        assert_eq!(form.fields[0].field_type, FieldType::Text);
        assert_eq!(
            artifact.timestamp.unwrap().to_rfc3339(),
            "2026-02-07T16:00:00+00:00"
        );
    }

    #[test]
    fn test_deserialize_reports_all_violations() {
        let err = Artifact::from_value(json!({
            "kind": "artifact",
            "component": "form",
            "props": {"title": "T", "fields": []},
            "color": "red"
        }))
        .unwrap_err();

        assert!(err.has_violation_at("color"));
        assert!(err.has_violation_at("id"));
        assert!(err.has_violation_at("props.fields"));
        assert_eq!(err.violations.len(), 3);
    }

    #[test]
    fn test_serde_deserialize_rejects_invalid() {
        let result = serde_json::from_str::<Artifact>(
            r#"{"kind":"artifact","id":"x","component":"chart","props":{"chart_type":"bar"}}"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("props.data"));
    }

    #[test]
    fn test_reserved_components_decode() {
        let artifact = Artifact::from_value(json!({
            "kind": "artifact",
            "id": "code",
            "component": "code_sandbox",
            "props": {"code": "fn main() {}", "language": "rust"}
        }))
        .unwrap();

        assert_eq!(artifact.component(), ComponentKind::CodeSandbox);
        assert!(!artifact.component().is_renderable());
        assert!(artifact.timestamp.is_none());
    }
}
