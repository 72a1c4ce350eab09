//! Strict structural validation of raw artifact JSON
//!
//! Typed deserialization stops at the first problem. Producers need to see
//! everything that is wrong with an emitted artifact, so untrusted input is
//! first walked as a plain [`Value`] and every violation is collected. Only a
//! value that passes this walk is handed to serde.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use super::{
    artifact::ComponentKind,
    error::Violation,
    form::{self, FieldType},
};

/// Literal value of the discriminator field
pub const ARTIFACT_KIND: &str = "artifact";

/// Discriminator key emitted by this crate
pub const KIND_KEY: &str = "kind";

/// Discriminator key used by earlier producers, accepted on input
pub const LEGACY_KIND_KEY: &str = "type";

const ARTIFACT_KEYS: &[&str] = &[
    KIND_KEY,
    LEGACY_KIND_KEY,
    "id",
    "component",
    "props",
    "timestamp",
    "metadata",
];
const FORM_KEYS: &[&str] = &[
    "title",
    "description",
    "fields",
    "submit_label",
    "cancel_label",
];
const FIELD_KEYS: &[&str] = &[
    "name",
    "type",
    "label",
    "options",
    "required",
    "default",
    "placeholder",
    "help_text",
];
const MARKDOWN_KEYS: &[&str] = &["content"];
const CHART_KEYS: &[&str] = &["chart_type", "data", "title"];
const CODE_SANDBOX_KEYS: &[&str] = &["code", "language", "filename", "editable"];

/// Join a parent path and a key into a dotted path
pub(crate) fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 one interpreted as UTC
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Expect {
    String,
    Bool,
    Object,
    Array,
}

impl Expect {
    fn matches(self, value: &Value) -> bool {
        match self {
            Expect::String => value.is_string(),
            Expect::Bool => value.is_boolean(),
            Expect::Object => value.is_object(),
            Expect::Array => value.is_array(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Expect::String => "string",
            Expect::Bool => "boolean",
            Expect::Object => "object",
            Expect::Array => "array",
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Presence {
    Required,
    Optional,
    Nullable,
}

#[derive(Default)]
struct Checker {
    violations: Vec<Violation>,
}

impl Checker {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation::new(path, message));
    }

    fn object<'v>(
        &mut self,
        path: &str,
        value: &'v Value,
        allowed: &[&str],
    ) -> Option<&'v Map<String, Value>> {
        let Some(map) = value.as_object() else {
            self.push(
                path,
                format!("expected object, found {}", type_name(value)),
            );
            return None;
        };

        for key in map.keys() {
            if !allowed.contains(&key.as_str()) {
                self.push(join(path, key), "unknown field");
            }
        }

        Some(map)
    }

    fn field<'v>(
        &mut self,
        map: &'v Map<String, Value>,
        path: &str,
        key: &str,
        expect: Expect,
        presence: Presence,
    ) -> Option<&'v Value> {
        match map.get(key) {
            None if presence == Presence::Required => {
                self.push(join(path, key), "missing required field");
                None
            }
            None => None,
            Some(Value::Null) if presence == Presence::Nullable => None,
            Some(value) if expect.matches(value) => Some(value),
            Some(value) => {
                self.push(
                    join(path, key),
                    format!("expected {}, found {}", expect.name(), type_name(value)),
                );
                None
            }
        }
    }

    fn discriminator(&mut self, map: &Map<String, Value>) {
        let (key, value) = match (map.get(KIND_KEY), map.get(LEGACY_KIND_KEY)) {
            (Some(_), Some(_)) => {
                self.push(LEGACY_KIND_KEY, "duplicate discriminator, use only \"kind\"");
                return;
            }
            (None, None) => {
                self.push(KIND_KEY, "missing required field");
                return;
            }
            (Some(value), None) => (KIND_KEY, value),
            (None, Some(value)) => (LEGACY_KIND_KEY, value),
        };

        if value.as_str() != Some(ARTIFACT_KIND) {
            self.push(key, format!("must be \"{ARTIFACT_KIND}\", found {value}"));
        }
    }

    fn component(&mut self, map: &Map<String, Value>) -> Option<ComponentKind> {
        let name = self
            .field(map, "", "component", Expect::String, Presence::Required)?
            .as_str()?;

        let kind = ComponentKind::parse(name);
        if kind.is_none() {
            let expected: Vec<_> = ComponentKind::ALL.iter().map(|k| k.as_str()).collect();
            self.push(
                "component",
                format!(
                    "unknown component \"{name}\", expected one of {}",
                    expected.join(", ")
                ),
            );
        }
        kind
    }

    fn props(&mut self, kind: ComponentKind, path: &str, value: &Value) {
        match kind {
            ComponentKind::Form => self.form(path, value),
            ComponentKind::Markdown => {
                if let Some(map) = self.object(path, value, MARKDOWN_KEYS) {
                    self.field(map, path, "content", Expect::String, Presence::Required);
                }
            }
            ComponentKind::Chart => {
                if let Some(map) = self.object(path, value, CHART_KEYS) {
                    self.field(map, path, "chart_type", Expect::String, Presence::Required);
                    self.field(map, path, "data", Expect::Object, Presence::Required);
                    self.field(map, path, "title", Expect::String, Presence::Nullable);
                }
            }
            ComponentKind::CodeSandbox => {
                if let Some(map) = self.object(path, value, CODE_SANDBOX_KEYS) {
                    self.field(map, path, "code", Expect::String, Presence::Required);
                    self.field(map, path, "language", Expect::String, Presence::Required);
                    self.field(map, path, "filename", Expect::String, Presence::Nullable);
                    self.field(map, path, "editable", Expect::Bool, Presence::Optional);
                }
            }
        }
    }

    fn form(&mut self, path: &str, value: &Value) {
        let Some(map) = self.object(path, value, FORM_KEYS) else {
            return;
        };

        if let Some(title) = self.field(map, path, "title", Expect::String, Presence::Required) {
            if title.as_str().is_some_and(|t| t.trim().is_empty()) {
                self.violations.push(form::empty_title(path));
            }
        }
        self.field(map, path, "description", Expect::String, Presence::Nullable);
        self.field(map, path, "submit_label", Expect::String, Presence::Optional);
        self.field(map, path, "cancel_label", Expect::String, Presence::Nullable);

        let fields = self
            .field(map, path, "fields", Expect::Array, Presence::Required)
            .and_then(Value::as_array);
        if let Some(fields) = fields {
            if fields.is_empty() {
                self.violations.push(form::empty_fields(path));
            }
            let fields_path = join(path, "fields");
            for (i, field) in fields.iter().enumerate() {
                self.form_field(&format!("{fields_path}[{i}]"), field);
            }
        }
    }

    fn form_field(&mut self, path: &str, value: &Value) {
        let Some(map) = self.object(path, value, FIELD_KEYS) else {
            return;
        };

        self.field(map, path, "name", Expect::String, Presence::Required);
        self.field(map, path, "label", Expect::String, Presence::Required);
        self.field(map, path, "required", Expect::Bool, Presence::Optional);
        self.field(map, path, "placeholder", Expect::String, Presence::Nullable);
        self.field(map, path, "help_text", Expect::String, Presence::Nullable);

        let field_type = self
            .field(map, path, "type", Expect::String, Presence::Required)
            .and_then(Value::as_str)
            .and_then(|name| {
                let parsed = FieldType::parse(name);
                if parsed.is_none() {
                    let expected: Vec<_> = FieldType::ALL.iter().map(|t| t.as_str()).collect();
                    self.push(
                        join(path, "type"),
                        format!(
                            "unknown field type \"{name}\", expected one of {}",
                            expected.join(", ")
                        ),
                    );
                }
                parsed
            });

        let mut option_count = 0;
        if let Some(options) = self
            .field(map, path, "options", Expect::Array, Presence::Optional)
            .and_then(Value::as_array)
        {
            option_count = options.len();
            for (i, option) in options.iter().enumerate() {
                if !option.is_string() {
                    self.push(
                        format!("{}[{i}]", join(path, "options")),
                        format!("expected string, found {}", type_name(option)),
                    );
                }
            }
        }
        if field_type == Some(FieldType::Select) && option_count == 0 {
            self.violations.push(form::empty_options(path));
        }

        if let Some(default) = map.get("default") {
            if matches!(default, Value::Array(_) | Value::Object(_)) {
                self.push(
                    join(path, "default"),
                    format!(
                        "expected string, number, boolean or null, found {}",
                        type_name(default)
                    ),
                );
            }
        }
    }
}

/// Collect every schema violation in a raw artifact value
pub(crate) fn check_artifact(value: &Value) -> Vec<Violation> {
    let mut checker = Checker::default();
    let Some(map) = checker.object("", value, ARTIFACT_KEYS) else {
        return checker.violations;
    };

    checker.discriminator(map);
    checker.field(map, "", "id", Expect::String, Presence::Required);
    let kind = checker.component(map);

    match (map.get("props"), kind) {
        (None, _) => checker.push("props", "missing required field"),
        (Some(props), Some(kind)) => checker.props(kind, "props", props),
        (Some(props), None) => {
            if !props.is_object() {
                checker.push(
                    "props",
                    format!("expected object, found {}", type_name(props)),
                );
            }
        }
    }

    if let Some(ts) = checker.field(map, "", "timestamp", Expect::String, Presence::Nullable) {
        if ts.as_str().and_then(parse_timestamp).is_none() {
            checker.push("timestamp", "not a valid ISO-8601 timestamp");
        }
    }
    checker.field(map, "", "metadata", Expect::Object, Presence::Optional);

    checker.violations
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn paths(value: Value) -> Vec<String> {
        check_artifact(&value).into_iter().map(|v| v.path).collect()
    }

    #[test]
    fn test_valid_minimal_form() {
        let value = json!({
            "kind": "artifact",
            "id": "f1",
            "component": "form",
            "props": {"title": "Confirm", "fields": [{"name": "ok", "type": "checkbox", "label": "OK"}]}
        });
        assert!(check_artifact(&value).is_empty());
    }

    #[test]
    fn test_legacy_discriminator_accepted() {
        let value = json!({
            "type": "artifact",
            "id": "md",
            "component": "markdown",
            "props": {"content": "# Hi"},
            "timestamp": "2026-02-07T16:00:00",
            "metadata": {}
        });
        assert!(check_artifact(&value).is_empty());
    }

    #[test]
    fn test_collects_all_violations() {
        let found = paths(json!({
            "kind": "widget",
            "component": "form",
            "props": {
                "title": "",
                "fields": [
                    {"name": "env", "type": "select", "label": "Env"},
                    {"name": "x", "type": "slider", "label": 3, "color": "red"}
                ],
                "submit_label": null
            },
            "timestamp": "yesterday",
            "extra": true
        }));

        for expected in [
            "extra",
            "kind",
            "id",
            "props.title",
            "props.submit_label",
            "props.fields[0].options",
            "props.fields[1].color",
            "props.fields[1].label",
            "props.fields[1].type",
            "timestamp",
        ] {
            assert!(found.iter().any(|p| p == expected), "missing {expected} in {found:?}");
        }
    }

    #[test]
    fn test_props_must_match_component() {
        let found = paths(json!({
            "kind": "artifact",
            "id": "x",
            "component": "form",
            "props": {"content": "# markdown"}
        }));
        assert!(found.contains(&"props.content".to_string()));
        assert!(found.contains(&"props.title".to_string()));
        assert!(found.contains(&"props.fields".to_string()));
    }

    #[test]
    fn test_unknown_component() {
        let violations = check_artifact(&json!({
            "kind": "artifact",
            "id": "x",
            "component": "video",
            "props": {}
        }));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("video"));
    }

    #[test]
    fn test_duplicate_discriminator() {
        let found = paths(json!({
            "kind": "artifact",
            "type": "artifact",
            "id": "x",
            "component": "markdown",
            "props": {"content": ""}
        }));
        assert_eq!(found, vec!["type".to_string()]);
    }

    #[test]
    fn test_not_an_object() {
        let violations = check_artifact(&json!(["artifact"]));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "expected object, found array");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2026-02-07T16:00:00Z").is_some());
        assert!(parse_timestamp("2026-02-07T16:00:00+02:00").is_some());
        assert!(parse_timestamp("2026-02-07T16:00:00.123").is_some());
        assert!(parse_timestamp("2026-02-07").is_none());
    }
}
