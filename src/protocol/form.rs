//! Form component payload

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::{
    error::{FormResponseError, ValidationError, Violation},
    response::ArtifactResponse,
    schema::join,
};

/// Type of a form input field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Single-line text input
    Text,

    /// Choice among a fixed list of options
    Select,

    /// Boolean toggle
    Checkbox,

    /// Multi-line text input
    Textarea,

    /// Numeric input
    Number,
}

impl FieldType {
    /// All field types, in wire order
    pub const ALL: [FieldType; 5] = [
        FieldType::Text,
        FieldType::Select,
        FieldType::Checkbox,
        FieldType::Textarea,
        FieldType::Number,
    ];

    /// Wire name of the field type
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
        }
    }

    /// Look up a field type by its wire name
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default value of a form field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean default (checkboxes)
    Bool(bool),

    /// Numeric default
    Number(Number),

    /// Text default
    Text(String),
}

impl FieldValue {
    /// Convert into a plain JSON value
    pub fn to_value(&self) -> Value {
        match self {
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Number(n) => Value::Number(n.clone()),
            FieldValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value.into())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

fn default_required() -> bool {
    true
}

fn default_submit_label() -> String {
    "Submit".to_string()
}

/// A single form field
///
/// `name` is the key of the field's value in the response payload. Names
/// should be unique within one form; this is not checked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FormField {
    /// Field identifier, used as key in the response
    pub name: String,

    /// Type of input
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Human-readable label
    pub label: String,

    /// Options for select fields (required to be non-empty for selects)
    #[serde(default)]
    pub options: Vec<String>,

    /// Whether a value must be supplied
    #[serde(default = "default_required")]
    pub required: bool,

    /// Default value
    #[serde(rename = "default", default)]
    pub default_value: Option<FieldValue>,

    /// Placeholder text for inputs
    #[serde(default)]
    pub placeholder: Option<String>,

    /// Additional help text
    #[serde(default)]
    pub help_text: Option<String>,
}

impl FormField {
    /// Create a required field of the given type with no options
    pub fn new(name: impl Into<String>, field_type: FieldType, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type,
            label: label.into(),
            options: Vec::new(),
            required: true,
            default_value: None,
            placeholder: None,
            help_text: None,
        }
    }

    /// Create a single-line text field
    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text, label)
    }

    /// Create a multi-line text field
    pub fn textarea(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, FieldType::Textarea, label)
    }

    /// Create a numeric field
    pub fn number(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number, label)
    }

    /// Create a checkbox field
    pub fn checkbox(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, FieldType::Checkbox, label)
    }

    /// Create a select field
    ///
    /// # Errors
    ///
    /// Fails if `options` is empty
    pub fn select<I, S>(
        name: impl Into<String>,
        label: impl Into<String>,
        options: I,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut field = Self::new(name, FieldType::Select, label);
        field.options = options.into_iter().map(Into::into).collect();

        let mut violations = Vec::new();
        field.check("", &mut violations);
        ValidationError::check(violations)?;
        Ok(field)
    }

    /// Set the default value
    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Set the placeholder text
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Set the help text
    pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    /// Mark the field as optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub(crate) fn check(&self, path: &str, out: &mut Vec<Violation>) {
        if self.field_type == FieldType::Select && self.options.is_empty() {
            out.push(empty_options(path));
        }
    }

    /// Value suggested to the user when no default is set
    fn example_value(&self) -> Value {
        if let Some(default) = &self.default_value {
            return default.to_value();
        }

        match self.field_type {
            FieldType::Select => self
                .options
                .first()
                .map(|o| Value::String(o.clone()))
                .unwrap_or(Value::Null),
            FieldType::Checkbox => Value::Bool(true),
            FieldType::Number => Value::Number(0.into()),
            FieldType::Text | FieldType::Textarea => {
                Value::String(self.placeholder.clone().unwrap_or_else(|| "...".to_string()))
            }
        }
    }
}

/// Interactive form collecting structured input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FormProps {
    /// Form title (non-empty)
    pub title: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Ordered fields (at least one)
    pub fields: Vec<FormField>,

    /// Label of the submit action
    #[serde(default = "default_submit_label")]
    pub submit_label: String,

    /// Label of the cancel action, if the form can be cancelled
    #[serde(default)]
    pub cancel_label: Option<String>,
}

impl FormProps {
    /// Create a form
    ///
    /// # Errors
    ///
    /// Fails if the title is empty, `fields` is empty, or any select field
    /// has no options
    pub fn new(title: impl Into<String>, fields: Vec<FormField>) -> Result<Self, ValidationError> {
        let props = Self {
            title: title.into(),
            description: None,
            fields,
            submit_label: default_submit_label(),
            cancel_label: None,
        };

        let mut violations = Vec::new();
        props.check("", &mut violations);
        ValidationError::check(violations)?;
        Ok(props)
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the submit label
    pub fn with_submit_label(mut self, label: impl Into<String>) -> Self {
        self.submit_label = label.into();
        self
    }

    /// Make the form cancellable with the given label
    pub fn with_cancel_label(mut self, label: impl Into<String>) -> Self {
        self.cancel_label = Some(label.into());
        self
    }

    pub(crate) fn check(&self, path: &str, out: &mut Vec<Violation>) {
        if self.title.trim().is_empty() {
            out.push(empty_title(path));
        }
        if self.fields.is_empty() {
            out.push(empty_fields(path));
        }
        for (i, field) in self.fields.iter().enumerate() {
            field.check(&format!("{}[{i}]", join(path, "fields")), out);
        }
    }

    /// Sample response object built from defaults, first options and placeholders
    pub fn example_response(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.example_value()))
            .collect()
    }

    /// Turn a user's raw reply into a response to this form
    ///
    /// A reply matching the cancel label cancels the form. Otherwise the
    /// reply must be a JSON object; missing fields take their default, and
    /// required fields without a default must be present.
    pub fn respond(
        &self,
        artifact_id: &str,
        reply: &str,
    ) -> Result<ArtifactResponse, FormResponseError> {
        let reply = reply.trim();

        if let Some(cancel) = &self.cancel_label {
            if reply.eq_ignore_ascii_case(cancel.trim()) {
                return Ok(ArtifactResponse::cancel(artifact_id));
            }
        }

        let value: Value = serde_json::from_str(reply)
            .map_err(|e| FormResponseError::NotJson(e.to_string()))?;
        let Value::Object(mut data) = value else {
            return Err(FormResponseError::NotAnObject);
        };

        let mut missing = Vec::new();
        for field in &self.fields {
            if data.contains_key(&field.name) {
                continue;
            }
            match &field.default_value {
                Some(default) => {
                    data.insert(field.name.clone(), default.to_value());
                }
                None if field.required => missing.push(field.name.clone()),
                None => {}
            }
        }

        if !missing.is_empty() {
            return Err(FormResponseError::MissingRequired(missing));
        }

        Ok(ArtifactResponse::submit(artifact_id, data))
    }
}

pub(crate) fn empty_title(path: &str) -> Violation {
    Violation::new(join(path, "title"), "must not be empty")
}

pub(crate) fn empty_fields(path: &str) -> Violation {
    Violation::new(join(path, "fields"), "must contain at least one field")
}

pub(crate) fn empty_options(path: &str) -> Violation {
    Violation::new(
        join(path, "options"),
        "select fields must have at least one option",
    )
}
