//! Plain-text rendering of artifacts
//!
//! Terminal surfaces print these lines as-is. Richer surfaces render the
//! [`Artifact`] themselves and only need this as a fallback.

use serde_json::Value;

use crate::protocol::{Artifact, ComponentProps, FieldType, FormProps};

const BANNER_WIDTH: usize = 26;
const RULER_WIDTH: usize = 40;

/// Render an artifact as printable lines
pub fn render_lines(artifact: &Artifact) -> Vec<String> {
    let mut lines = vec![format!("Agent emitted artifact: {}", artifact.component())];

    match &artifact.props {
        ComponentProps::Form(form) => render_form(form, &mut lines),
        ComponentProps::Markdown(markdown) => {
            let ruler = "─".repeat(RULER_WIDTH);
            lines.push(ruler.clone());
            lines.extend(markdown.content.lines().map(str::to_string));
            lines.push(ruler);
        }
        ComponentProps::Chart(_) | ComponentProps::CodeSandbox(_) => {
            lines.push(format!(
                "Artifact type '{}' not yet supported",
                artifact.component()
            ));
            match artifact.to_json_pretty() {
                Ok(json) => lines.extend(json.lines().map(str::to_string)),
                Err(e) => lines.push(format!("(artifact could not be serialized: {e})")),
            }
        }
    }

    lines
}

fn render_form(form: &FormProps, lines: &mut Vec<String>) {
    let border = "═".repeat(BANNER_WIDTH + 2);
    lines.push(format!("╔{border}╗"));
    lines.push(format!("║ {:^width$} ║", form.title, width = BANNER_WIDTH));
    lines.push(format!("╚{border}╝"));

    if let Some(description) = &form.description {
        lines.push(description.clone());
    }

    lines.push("Form Fields:".to_string());
    for (i, field) in form.fields.iter().enumerate() {
        let marker = if field.required { "*" } else { "" };
        let head = format!("  {}. {}{marker}: {}", i + 1, field.label, field.field_type);
        lines.push(match field.field_type {
            FieldType::Select => format!("{head} (options: {})", field.options.join(", ")),
            FieldType::Checkbox => format!("{head} (true/false)"),
            _ => head,
        });

        if let Some(help) = &field.help_text {
            lines.push(format!("     {help}"));
        }
        if let Some(default) = &field.default_value {
            lines.push(format!("     Default: {default}"));
        }
    }

    lines.push(String::new());
    lines.push("Please respond in JSON format:".to_string());
    lines.push(format!(
        "Example: {}",
        Value::Object(form.example_response())
    ));
    if let Some(cancel) = &form.cancel_label {
        lines.push(format!("Or reply \"{cancel}\" to cancel."));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::protocol::FormField;

    #[test]
    fn test_render_form() {
        let form = FormProps::new(
            "Deploy",
            vec![
                FormField::select("env", "Environment", ["staging", "prod"]).unwrap(),
                FormField::checkbox("confirm", "Confirm")
                    .optional()
                    .with_help_text("Required for prod"),
                FormField::text("note", "Note").with_default("none"),
            ],
        )
        .unwrap()
        .with_description("Ship the build")
        .with_cancel_label("Abort");
        let lines = render_lines(&Artifact::form("deploy", form).unwrap());

        assert_eq!(lines[0], "Agent emitted artifact: form");
        assert!(lines[2].contains("Deploy"));
        assert!(lines.contains(&"Ship the build".to_string()));
        assert!(lines.contains(&"  1. Environment*: select (options: staging, prod)".to_string()));
        assert!(lines.contains(&"  2. Confirm: checkbox (true/false)".to_string()));
        assert!(lines.contains(&"     Required for prod".to_string()));
        assert!(lines.contains(&"     Default: none".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("Example: {")));
        assert_eq!(lines.last().unwrap(), "Or reply \"Abort\" to cancel.");
    }

    #[test]
    fn test_render_markdown() {
        let lines = render_lines(&Artifact::markdown("md", "# Results\nAll green"));
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[2], "# Results");
        assert_eq!(lines[3], "All green");
    }

    #[test]
    fn test_render_unsupported_component() {
        let artifact = Artifact::from_value(json!({
            "kind": "artifact",
            "id": "c1",
            "component": "chart",
            "props": {"chart_type": "bar", "data": {"a": 1}}
        }))
        .unwrap();

        let lines = render_lines(&artifact);
        assert_eq!(lines[1], "Artifact type 'chart' not yet supported");
        assert!(lines.iter().any(|l| l.contains("\"chart_type\": \"bar\"")));
    }
}
