//! Session controller: drives the interaction state from user input and
//! runtime events
//!
//! The controller never awaits anything. It decides which [`RuntimeCall`] a
//! submission needs and queues [`DisplayEvent`]s; the session actor
//! dispatches the call and forwards the events.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    error::RuntimeError,
    extract::{extract, extract_final, Extraction},
    interaction::{InteractionState, Mode, RouteTarget},
    protocol::Artifact,
    runtime::{AgentRuntime, ExecutionEvent},
    service::{RuntimeCall, RuntimeReply},
    session::{DisplayEvent, SessionConfig, Speaker},
};

const BUSY_MESSAGE: &str = "Agent is still running, please wait.";

/// What happened to a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A new execution was requested
    Started,

    /// The reply was routed to a waiting node or form
    Delivered(RouteTarget),

    /// An execution is running; nothing changed
    Busy,

    /// The submission was blank; nothing changed
    Empty,

    /// The submission could not be used
    Rejected(String),
}

impl SubmitOutcome {
    /// Check if the submission produced a runtime call
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Started | SubmitOutcome::Delivered(_))
    }
}

pub(crate) struct Controller<R: ?Sized> {
    runtime: Arc<R>,
    config: SessionConfig,
    state: InteractionState,
    outbox: Vec<DisplayEvent>,
    /// Bumped for every new execution; tags dispatched calls
    generation: u64,
}

impl<R> Controller<R>
where
    R: AgentRuntime + ?Sized,
{
    pub(crate) fn new(runtime: Arc<R>, config: SessionConfig) -> Self {
        Self {
            runtime,
            config,
            state: InteractionState::new(),
            outbox: Vec::new(),
            generation: 0,
        }
    }

    pub(crate) fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Generation of the current execution
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Drain the display events queued since the last call
    pub(crate) fn take_display(&mut self) -> Vec<DisplayEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Handle a user submission
    pub(crate) fn submit(&mut self, text: &str) -> (SubmitOutcome, Option<RuntimeCall>) {
        let text = text.trim();
        if text.is_empty() {
            return (SubmitOutcome::Empty, None);
        }

        let before = self.state.mode();
        let result = match before {
            Mode::Executing => {
                debug!("submission rejected, execution in flight");
                self.outbox.push(DisplayEvent::BusyNotice {
                    message: BUSY_MESSAGE.to_string(),
                });
                (SubmitOutcome::Busy, None)
            }
            Mode::AwaitingStructuredInput => self.deliver(text),
            Mode::Idle => self.start(text),
        };
        self.note_mode_change(before);
        result
    }

    fn start(&mut self, text: &str) -> (SubmitOutcome, Option<RuntimeCall>) {
        let (entry_point_id, input_key) = match self.resolve_entry() {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "cannot start execution");
                self.outbox.push(DisplayEvent::error(format!("Error: {e}")));
                return (SubmitOutcome::Rejected(e.to_string()), None);
            }
        };

        self.outbox.push(DisplayEvent::line(Speaker::User, text));
        self.state.begin();
        self.generation += 1;
        info!(entry_point = %entry_point_id, input_key = %input_key, "starting execution");

        let call = RuntimeCall::trigger(entry_point_id, input_key, text);
        (SubmitOutcome::Started, Some(call))
    }

    fn deliver(&mut self, text: &str) -> (SubmitOutcome, Option<RuntimeCall>) {
        let target = match self.state.route() {
            Ok(target) => target,
            Err(e) => {
                warn!(error = %e, "submission could not be routed");
                self.outbox.push(DisplayEvent::error(e.to_string()));
                self.state.reset();
                return (SubmitOutcome::Rejected(e.to_string()), None);
            }
        };

        let value = match &target {
            RouteTarget::Node(_) => Value::String(text.to_string()),
            RouteTarget::ArtifactForm => match self.form_reply(text) {
                Ok(value) => value,
                Err(message) => {
                    self.outbox.push(DisplayEvent::error(message.clone()));
                    return (SubmitOutcome::Rejected(message), None);
                }
            },
        };

        let node_id = match &target {
            RouteTarget::Node(id) => id.clone(),
            RouteTarget::ArtifactForm => self.config.form_response_node.clone(),
        };

        self.outbox.push(DisplayEvent::line(Speaker::User, text));
        self.state.resume();
        info!(node_id = %node_id, route = %target, "delivering input");

        (
            SubmitOutcome::Delivered(target),
            Some(RuntimeCall::inject(node_id, value)),
        )
    }

    /// Turn a reply to the active form into the serialized response
    fn form_reply(&self, text: &str) -> Result<Value, String> {
        let Some((artifact_id, form)) = self.state.active_form() else {
            return Err("no active form to respond to".to_string());
        };

        let response = form.respond(artifact_id, text).map_err(|e| {
            let example = Value::Object(form.example_response());
            format!("Invalid form response: {e}. Example: {example}")
        })?;
        debug!(artifact_id, action = %response.action, "form response built");

        serde_json::to_value(&response).map_err(|e| format!("Invalid form response: {e}"))
    }

    /// Entry point id and input key for a new execution
    fn resolve_entry(&self) -> Result<(String, String), RuntimeError> {
        let entry_points = self.runtime.entry_points();
        let entry = match &self.config.entry_point {
            Some(id) => entry_points
                .into_iter()
                .find(|ep| &ep.id == id)
                .ok_or_else(|| RuntimeError::EntryPointNotFound(id.clone()))?,
            None => entry_points
                .into_iter()
                .next()
                .ok_or(RuntimeError::NoEntryPoints)?,
        };

        let input_key = self
            .runtime
            .node(&entry.entry_node)
            .and_then(|node| node.input_keys.into_iter().next())
            .unwrap_or_else(|| self.config.default_input_key.clone());

        Ok((entry.id, input_key))
    }

    /// Handle one runtime event
    pub(crate) fn on_event(&mut self, event: ExecutionEvent) {
        let before = self.state.mode();
        debug!(event = event.kind(), mode = %before, "runtime event");

        match event {
            ExecutionEvent::TextDelta { snapshot, .. } => {
                let artifact_detected = !matches!(extract(&snapshot), Extraction::NotPresent);
                self.outbox.push(DisplayEvent::Preview {
                    text: preview(&snapshot, self.config.preview_chars),
                    artifact_detected,
                });
                self.state.set_snapshot(snapshot);
            }
            ExecutionEvent::ToolStarted { tool_name, .. } => {
                self.outbox
                    .push(DisplayEvent::line(Speaker::Tool, format!("Tool: {tool_name}")));
            }
            ExecutionEvent::ToolCompleted {
                tool_name,
                result,
                is_error,
            } => {
                let shown = truncate(&result, self.config.tool_preview_chars).replace('\n', " ");
                let line = if is_error {
                    format!("Tool {tool_name} error: {shown}")
                } else {
                    format!("Tool {tool_name} result: {shown}")
                };
                self.outbox.push(DisplayEvent::line(Speaker::Tool, line));
            }
            ExecutionEvent::ExecutionCompleted { output } => self.complete(output),
            ExecutionEvent::ExecutionFailed { error } => {
                warn!(error = %error, "execution failed");
                self.outbox
                    .push(DisplayEvent::error(format!("Execution failed: {error}")));
                self.state.reset();
            }
            ExecutionEvent::InputRequested { node_id } => {
                let text = self.state.take_text();
                if !text.is_empty() {
                    self.outbox.push(DisplayEvent::line(Speaker::Agent, text));
                }
                let target = RouteTarget::from_signal(node_id);
                info!(route = %target, "input requested");
                self.state.await_input(target);
            }
        }

        self.note_mode_change(before);
    }

    fn complete(&mut self, output: Value) {
        let streamed = self.state.take_text();
        let text = if streamed.is_empty() {
            output_text(&output)
        } else {
            streamed
        };

        let rendered = match extract_final(&text) {
            Extraction::Found(artifact) => {
                self.render(&artifact);
                Some(artifact)
            }
            Extraction::Malformed(e) => {
                warn!(error = %e, "agent emitted a malformed artifact");
                self.push_agent_text(text);
                None
            }
            Extraction::NotPresent | Extraction::Incomplete => {
                self.push_agent_text(text);
                None
            }
        };

        info!(artifact = rendered.is_some(), "execution completed");
        self.state.finish(rendered);
    }

    fn render(&mut self, artifact: &Artifact) {
        let replaces = self
            .state
            .active_artifact()
            .is_some_and(|active| active.id == artifact.id);
        info!(
            artifact_id = %artifact.id,
            component = %artifact.component(),
            replaces,
            "rendering artifact"
        );
        self.outbox.push(DisplayEvent::ArtifactRendered {
            artifact: artifact.clone(),
            replaces,
        });
    }

    fn push_agent_text(&mut self, text: String) {
        if !text.trim().is_empty() {
            self.outbox.push(DisplayEvent::line(Speaker::Agent, text));
        }
    }

    /// Handle the result of a dispatched runtime call
    ///
    /// Results of calls made for an earlier execution are dropped.
    pub(crate) fn on_dispatch(
        &mut self,
        call: &'static str,
        generation: u64,
        result: Result<RuntimeReply, RuntimeError>,
    ) {
        if generation != self.generation {
            debug!(
                call,
                generation,
                current = self.generation,
                "dropping result of a superseded call"
            );
            return;
        }

        let before = self.state.mode();

        match result {
            Ok(RuntimeReply::Triggered(id)) => {
                if self.state.record_execution(id.clone()) {
                    debug!(execution_id = %id, "execution id recorded");
                } else {
                    debug!(execution_id = %id, "execution id arrived after execution ended");
                }
            }
            Ok(reply) => debug!(call, ?reply, "runtime call succeeded"),
            Err(e) if call == "cancel" => warn!(error = %e, "cancel request failed"),
            Err(e) => {
                warn!(call, error = %e, "runtime call failed");
                self.outbox.push(DisplayEvent::error(format!("Error: {e}")));
                self.state.reset();
            }
        }

        self.note_mode_change(before);
    }

    /// Best-effort cancel call for the execution in flight
    pub(crate) fn cancel_call(&self) -> Option<RuntimeCall> {
        self.state
            .pending_exec_id()
            .map(|execution_id| RuntimeCall::Cancel {
                execution_id: execution_id.clone(),
            })
    }

    fn note_mode_change(&mut self, before: Mode) {
        let after = self.state.mode();
        if after != before {
            debug!(from = %before, to = %after, "mode changed");
            self.outbox.push(DisplayEvent::ModeChanged(after));
        }
    }
}

/// Final text of an execution that streamed nothing
fn output_text(output: &Value) -> String {
    match output {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Object(map) => match map.get("output_string") {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => output.to_string(),
        },
        other => other.to_string(),
    }
}

/// Last `width` characters of `text` on one line
fn preview(text: &str, width: usize) -> String {
    let flat = text.replace('\n', " ");
    let count = flat.chars().count();
    if count <= width {
        return flat;
    }
    let tail: String = flat.chars().skip(count - width).collect();
    format!("...{tail}")
}

/// First `width` characters of `text`
fn truncate(text: &str, width: usize) -> String {
    match text.char_indices().nth(width) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
