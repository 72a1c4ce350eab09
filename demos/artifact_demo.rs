use std::time::Duration;

use artifact_relay::{prelude::*, runtime::ExecutionEvent, session::DisplayStream};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const WELCOME: &str = r#"# Artifacts Demo

Welcome! This agent shows the interactive output protocol by:

1. Displaying this **Markdown** artifact
2. Emitting a **Form** artifact for you to fill out
3. Processing your submission
4. Showing formatted results"#;

fn welcome() -> anyhow::Result<String> {
    Ok(Artifact::markdown("welcome-md-001", WELCOME).to_json()?)
}

fn deployment_form() -> anyhow::Result<String> {
    let form = FormProps::new(
        "Deployment Configuration",
        vec![
            FormField::select(
                "environment",
                "Target Environment",
                ["development", "staging", "production"],
            )?
            .with_default("staging")
            .with_help_text("Select the environment to deploy to"),
            FormField::text("branch", "Git Branch")
                .with_default("main")
                .with_placeholder("e.g., main, develop, feature/xyz"),
            FormField::checkbox("run_tests", "Run tests before deployment")
                .with_default(true)
                .optional(),
            FormField::checkbox(
                "confirm",
                "I understand this will deploy to the selected environment",
            ),
        ],
    )?
    .with_description("Please configure your deployment settings below:")
    .with_submit_label("Deploy Now")
    .with_cancel_label("cancel");

    let artifact = Artifact::form("deployment-form-001", form)?;
    Ok(format!(
        "Let's configure the deployment.\n{}\n",
        artifact.to_json()?
    ))
}

fn results() -> anyhow::Result<String> {
    let report = "# Deployment Complete\n\n\
        | Parameter | Value |\n\
        |-----------|-------|\n\
        | Environment | **staging** |\n\
        | Branch | `main` |\n\
        | Status | **SUCCESS** |\n\n\
        ## Next Steps\n\n\
        1. Monitor the deployment logs\n\
        2. Verify application health checks";
    Ok(Artifact::markdown("results-md-001", report).to_json()?)
}

/// Print display events until the session accepts input again
async fn settle(display: &mut DisplayStream) {
    while let Some(event) = display.recv().await {
        match event {
            DisplayEvent::HistoryLine { speaker, text } => println!("{speaker}: {text}"),
            DisplayEvent::Preview { .. } => {}
            DisplayEvent::ArtifactRendered { artifact, replaces } => {
                if replaces {
                    println!("(replacing {})", artifact.id);
                }
                for line in render_lines(&artifact) {
                    println!("{line}");
                }
            }
            DisplayEvent::BusyNotice { message } => println!("{message}"),
            DisplayEvent::ErrorNotice { message } => eprintln!("✗ {message}"),
            DisplayEvent::ModeChanged(mode) => {
                println!("[mode: {mode}]");
                if mode.accepts_input() {
                    println!();
                    return;
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Artifact Relay demo\n");

    let deploy_result = json!({"environment": "staging", "status": "success"});
    let runtime = ScriptedRuntime::new()
        .with_entry_point(EntryPoint::new("main", "welcome"))
        .with_node(NodeSpec::new("welcome", ["user_input"]))
        .with_node(NodeSpec::new("process_deployment", ["user_response"]).client_facing())
        .with_event_delay(Duration::from_millis(5))
        .with_script(Script::streamed(&welcome()?, 24))
        .with_script(Script::streamed(&deployment_form()?, 24))
        .with_script(
            Script::events([
                ExecutionEvent::ToolStarted {
                    tool_name: "deploy".into(),
                    tool_input: json!({"environment": "staging"}),
                },
                ExecutionEvent::ToolCompleted {
                    tool_name: "deploy".into(),
                    result: deploy_result.to_string(),
                    is_error: false,
                },
            ])
            .then(ExecutionEvent::ExecutionCompleted {
                output: json!({ "output_string": results()? }),
            }),
        );

    let (session, mut display) = SessionBuilder::new(runtime)
        .with_form_response_node("process_deployment")
        .with_call_timeout(Duration::from_secs(10))
        .build();

    for input in [
        "hello",
        "I'd like to deploy",
        "not json",
        r#"{"environment": "staging", "confirm": true}"#,
    ] {
        let outcome = session.submit(input).await?;
        if outcome.is_accepted() {
            settle(&mut display).await;
        } else {
            // Rejected replies only produce a notice
            while let Some(event) = display.try_recv() {
                if let DisplayEvent::ErrorNotice { message } = event {
                    eprintln!("✗ {message}\n");
                }
            }
        }
    }

    session.shutdown().await?;
    Ok(())
}
