//! End-to-end session tests over the scripted runtime

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use artifact_relay::{
    interaction::{Mode, RouteTarget},
    prelude::*,
    runtime::ExecutionId,
    service::RuntimeCall,
    session::DisplayStream,
};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{json, Map, Value};
use tokio_test::{assert_err, assert_ok};

const FORM_JSON: &str = r#"{"kind":"artifact","id":"f1","component":"form","props":{"title":"Confirm","fields":[{"name":"ok","type":"checkbox","label":"OK"}]}}"#;

fn runtime() -> ScriptedRuntime {
    ScriptedRuntime::new()
        .with_entry_point(EntryPoint::new("main", "intake"))
        .with_node(NodeSpec::new("intake", ["request"]))
}

/// Collect display events until the session accepts input again
async fn settle(display: &mut DisplayStream) -> Vec<DisplayEvent> {
    let collect = async {
        let mut events = Vec::new();
        while let Some(event) = display.recv().await {
            let done = matches!(event, DisplayEvent::ModeChanged(mode) if mode.accepts_input());
            events.push(event);
            if done {
                break;
            }
        }
        events
    };
    tokio::time::timeout(Duration::from_secs(5), collect)
        .await
        .expect("session did not settle")
}

fn agent_lines(events: &[DisplayEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| match event {
            DisplayEvent::HistoryLine {
                speaker: Speaker::Agent,
                text,
            } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

fn trigger_count(runtime: &ScriptedRuntime) -> usize {
    runtime
        .calls()
        .iter()
        .filter(|call| matches!(call, RuntimeCall::Trigger { .. }))
        .count()
}

#[tokio::test]
async fn test_plain_completion_returns_to_idle() {
    let runtime = runtime().with_script(Script::streamed("Sure, deploying...", 4));
    let (session, mut display) = SessionBuilder::new(runtime.clone()).build();

    let outcome = assert_ok!(session.submit("deploy to staging").await);
    assert_eq!(outcome, SubmitOutcome::Started);

    let events = settle(&mut display).await;
    assert_eq!(agent_lines(&events), vec!["Sure, deploying..."]);
    assert_eq!(events.last(), Some(&DisplayEvent::ModeChanged(Mode::Idle)));

    let mut input = serde_json::Map::new();
    input.insert("request".into(), json!("deploy to staging"));
    assert_eq!(
        runtime.calls(),
        vec![RuntimeCall::Trigger {
            entry_point_id: "main".into(),
            input,
        }]
    );

    let state = assert_ok!(session.snapshot().await);
    assert_eq!(state.mode(), Mode::Idle);
    assert_eq!(state.accumulated_text(), "");
}

#[tokio::test]
async fn test_form_round_trip() {
    let runtime = runtime()
        .with_script(Script::streamed(
            &format!("Please confirm:\n{FORM_JSON}\nThanks!"),
            7,
        ))
        .with_script(Script::streamed("Confirmed, deploying now.", 10));
    let (session, mut display) = SessionBuilder::new(runtime.clone()).build();

    assert_ok!(session.submit("deploy").await);
    let events = settle(&mut display).await;

    let rendered = events.iter().find_map(|event| match event {
        DisplayEvent::ArtifactRendered { artifact, replaces } => Some((artifact, *replaces)),
        _ => None,
    });
    let (artifact, replaces) = rendered.expect("form was not rendered");
    assert_eq!(artifact.id, "f1");
    assert!(!replaces);
    assert!(events.iter().any(|event| matches!(
        event,
        DisplayEvent::Preview {
            artifact_detected: true,
            ..
        }
    )));

    let state = assert_ok!(session.snapshot().await);
    assert_eq!(state.mode(), Mode::AwaitingStructuredInput);
    assert_eq!(state.pending_route_target(), Some(&RouteTarget::ArtifactForm));

    let outcome = assert_ok!(session.submit(r#"{"ok": true}"#).await);
    assert_eq!(outcome, SubmitOutcome::Delivered(RouteTarget::ArtifactForm));

    let events = settle(&mut display).await;
    assert!(events.contains(&DisplayEvent::ModeChanged(Mode::Executing)));
    assert_eq!(agent_lines(&events), vec!["Confirmed, deploying now."]);

    assert_eq!(trigger_count(&runtime), 1);
    let Some(RuntimeCall::InjectInput { node_id, value }) = runtime.calls().pop() else {
        panic!("form reply was not injected");
    };
    assert_eq!(node_id, "artifact_form");
    assert_eq!(value["artifact_id"], "f1");
    assert_eq!(value["data"]["ok"], true);
}

#[tokio::test]
async fn test_truncated_artifact_falls_back_to_text() {
    let raw = r#"Result: {"kind":"artifact","component":"form""#;
    let runtime = runtime().with_script(Script::streamed(raw, 6));
    let (session, mut display) = SessionBuilder::new(runtime).build();

    assert_ok!(session.submit("go").await);
    let events = settle(&mut display).await;

    assert_eq!(agent_lines(&events), vec![raw]);
    assert!(!events
        .iter()
        .any(|event| matches!(event, DisplayEvent::ArtifactRendered { .. })));
    assert_eq!(assert_ok!(session.snapshot().await).mode(), Mode::Idle);
}

#[tokio::test]
async fn test_double_submit_is_rejected() {
    let runtime = runtime()
        .with_event_delay(Duration::from_millis(20))
        .with_script(Script::streamed("working on it", 3));
    let (session, mut display) = SessionBuilder::new(runtime.clone()).build();

    assert_eq!(
        assert_ok!(session.submit("first").await),
        SubmitOutcome::Started
    );
    assert_eq!(
        assert_ok!(session.submit("second").await),
        SubmitOutcome::Busy
    );

    let events = settle(&mut display).await;
    assert!(events
        .iter()
        .any(|event| matches!(event, DisplayEvent::BusyNotice { .. })));
    assert_eq!(trigger_count(&runtime), 1);
}

#[tokio::test]
async fn test_input_request_routes_to_node() {
    let runtime = runtime()
        .with_script(Script::asks("Approve the plan?", 5, Some("review")))
        .with_script(Script::streamed("Plan approved.", 5));
    let (session, mut display) = SessionBuilder::new(runtime.clone()).build();

    assert_ok!(session.submit("plan the release").await);
    let events = settle(&mut display).await;
    assert_eq!(agent_lines(&events), vec!["Approve the plan?"]);
    assert_eq!(
        events.last(),
        Some(&DisplayEvent::ModeChanged(Mode::AwaitingStructuredInput))
    );

    let outcome = assert_ok!(session.submit("yes").await);
    assert_eq!(
        outcome,
        SubmitOutcome::Delivered(RouteTarget::Node("review".into()))
    );
    settle(&mut display).await;

    assert_eq!(
        runtime.calls().last(),
        Some(&RuntimeCall::InjectInput {
            node_id: "review".into(),
            value: json!("yes"),
        })
    );
}

#[tokio::test]
async fn test_execution_failure_is_surfaced() {
    let runtime = runtime().with_script(Script::events([ExecutionEvent::ExecutionFailed {
        error: "tool crashed".into(),
    }]));
    let (session, mut display) = SessionBuilder::new(runtime).build();

    assert_ok!(session.submit("go").await);
    let events = settle(&mut display).await;

    assert!(events.contains(&DisplayEvent::ErrorNotice {
        message: "Execution failed: tool crashed".into()
    }));
    assert_eq!(events.last(), Some(&DisplayEvent::ModeChanged(Mode::Idle)));
}

#[tokio::test]
async fn test_runtime_call_failure_restores_input() {
    let runtime = runtime().with_script(Script::fail("model offline"));
    let (session, mut display) = SessionBuilder::new(runtime).build();

    assert_eq!(
        assert_ok!(session.submit("go").await),
        SubmitOutcome::Started
    );
    let events = settle(&mut display).await;

    assert!(events.contains(&DisplayEvent::ErrorNotice {
        message: "Error: runtime call failed: model offline".into()
    }));
    assert_eq!(assert_ok!(session.snapshot().await).mode(), Mode::Idle);
}

#[tokio::test]
async fn test_cancel_forwards_execution_id() {
    let runtime = runtime()
        .with_event_delay(Duration::from_millis(50))
        .with_script(Script::streamed("long running work", 2));
    let (session, _display) = SessionBuilder::new(runtime.clone()).build();

    assert!(!assert_ok!(session.cancel().await));
    assert_ok!(session.submit("go").await);

    let execution_id = loop {
        let state = assert_ok!(session.snapshot().await);
        if let Some(id) = state.pending_exec_id() {
            break id.clone();
        }
        tokio::task::yield_now().await;
    };

    assert!(assert_ok!(session.cancel().await));
    assert_eq!(
        assert_ok!(session.snapshot().await).mode(),
        Mode::Executing
    );

    let cancelled = async {
        loop {
            let found = runtime.calls().contains(&RuntimeCall::Cancel {
                execution_id: execution_id.clone(),
            });
            if found {
                break;
            }
            tokio::task::yield_now().await;
        }
    };
    assert_ok!(tokio::time::timeout(Duration::from_secs(5), cancelled).await);
}

#[tokio::test]
async fn test_closed_session_reports_error() {
    let (session, mut display) = SessionBuilder::new(runtime()).build();
    assert_ok!(session.shutdown().await);

    assert_eq!(display.recv().await, None);
    assert_err!(session.submit("hello").await);
    assert!(session.is_closed());
}

/// Runtime whose trigger takes longer than any reasonable timeout
#[derive(Default)]
struct SlowRuntime {
    triggers: AtomicUsize,
}

#[async_trait]
impl AgentRuntime for SlowRuntime {
    fn entry_points(&self) -> Vec<EntryPoint> {
        vec![EntryPoint::new("main", "intake")]
    }

    fn node(&self, _id: &str) -> Option<NodeSpec> {
        None
    }

    async fn trigger(
        &self,
        _entry_point_id: &str,
        _input: Map<String, Value>,
    ) -> Result<ExecutionId, RuntimeError> {
        self.triggers.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(45)).await;
        Ok(ExecutionId::new("slow-1"))
    }

    async fn inject_input(&self, _node_id: &str, _value: Value) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, ExecutionEvent> {
        stream::pending().boxed()
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_trigger_keeps_session_busy() {
    let runtime = Arc::new(SlowRuntime::default());
    let (session, _display) = SessionBuilder::from_shared(runtime.clone()).build();

    assert_eq!(
        assert_ok!(session.submit("first").await),
        SubmitOutcome::Started
    );
    tokio::time::sleep(Duration::from_secs(31)).await;

    assert_eq!(
        assert_ok!(session.snapshot().await).mode(),
        Mode::Executing
    );
    assert_eq!(
        assert_ok!(session.submit("second").await),
        SubmitOutcome::Busy
    );
    assert_eq!(runtime.triggers.load(Ordering::SeqCst), 1);
}
