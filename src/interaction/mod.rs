//! Interaction state machine for one session
//!
//! The state is owned by a single session actor. Transitions are plain
//! methods so the machine can be exercised without a runtime.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::{
    protocol::{Artifact, FormProps},
    runtime::ExecutionId,
};

/// Interaction mode of a session
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// No execution in flight, input starts a new request
    #[default]
    Idle,

    /// One execution in flight, input is rejected
    Executing,

    /// The agent is waiting for the user's reply
    AwaitingStructuredInput,
}

impl Mode {
    /// Check if the input box should be enabled
    pub fn accepts_input(&self) -> bool {
        !matches!(self, Mode::Executing)
    }

    /// Name of the mode, as used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Executing => "executing",
            Mode::AwaitingStructuredInput => "awaiting_structured_input",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the next submission is delivered while awaiting input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// A runtime node that signalled for input
    Node(String),

    /// The handler of the active rendered form
    ArtifactForm,
}

impl RouteTarget {
    /// Target for an input request; a missing or blank node id means the active form
    pub fn from_signal(node_id: Option<String>) -> Self {
        match node_id {
            Some(id) if !id.trim().is_empty() => RouteTarget::Node(id),
            _ => RouteTarget::ArtifactForm,
        }
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTarget::Node(id) => write!(f, "node:{id}"),
            RouteTarget::ArtifactForm => f.write_str("artifact-form"),
        }
    }
}

/// A submission could not be routed while awaiting input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// Awaiting input without any route target
    #[error("no input target is pending")]
    NoTarget,

    /// The route points at a form, but none is active
    #[error("no active form to respond to")]
    NoActiveForm,
}

/// Mutable state of one interactive session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionState {
    mode: Mode,
    pending_exec_id: Option<ExecutionId>,
    pending_route_target: Option<RouteTarget>,
    accumulated_text: String,
    active_artifact: Option<Artifact>,
}

impl InteractionState {
    /// Create an idle state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Execution currently in flight
    pub fn pending_exec_id(&self) -> Option<&ExecutionId> {
        self.pending_exec_id.as_ref()
    }

    /// Target for the next submission
    pub fn pending_route_target(&self) -> Option<&RouteTarget> {
        self.pending_route_target.as_ref()
    }

    /// Streaming text of the current execution
    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    /// Most recently rendered artifact still pending a reply
    pub fn active_artifact(&self) -> Option<&Artifact> {
        self.active_artifact.as_ref()
    }

    /// The active artifact's id and form payload, if it is a form
    pub fn active_form(&self) -> Option<(&str, &FormProps)> {
        let artifact = self.active_artifact.as_ref()?;
        artifact.as_form().map(|form| (artifact.id.as_str(), form))
    }

    /// Start a new top-level execution
    pub fn begin(&mut self) {
        self.mode = Mode::Executing;
        self.pending_exec_id = None;
        self.pending_route_target = None;
        self.accumulated_text.clear();
    }

    /// Continue the current execution after a reply was delivered
    pub fn resume(&mut self) {
        self.mode = Mode::Executing;
        self.pending_route_target = None;
        self.accumulated_text.clear();
    }

    /// Remember the id returned by the runtime for the execution in flight
    ///
    /// Ignored unless an execution is running and has no id yet. Returns
    /// whether the id was stored.
    pub fn record_execution(&mut self, id: ExecutionId) -> bool {
        if self.mode == Mode::Executing && self.pending_exec_id.is_none() {
            self.pending_exec_id = Some(id);
            true
        } else {
            false
        }
    }

    /// Replace the streaming text with the runtime's cumulative snapshot
    pub fn set_snapshot(&mut self, snapshot: impl Into<String>) {
        self.accumulated_text = snapshot.into();
    }

    /// Take the streaming text, leaving it empty
    pub fn take_text(&mut self) -> String {
        std::mem::take(&mut self.accumulated_text)
    }

    /// Wait for the user's reply; a later signal overwrites an earlier target
    pub fn await_input(&mut self, target: RouteTarget) {
        self.mode = Mode::AwaitingStructuredInput;
        self.pending_route_target = Some(target);
    }

    /// Close the execution
    ///
    /// A rendered form keeps the session waiting for the form response.
    /// Anything else returns to idle with no active artifact.
    pub fn finish(&mut self, rendered: Option<Artifact>) {
        self.pending_exec_id = None;
        self.accumulated_text.clear();

        match rendered {
            Some(artifact) if artifact.is_form() => {
                self.active_artifact = Some(artifact);
                self.mode = Mode::AwaitingStructuredInput;
                self.pending_route_target = Some(RouteTarget::ArtifactForm);
            }
            _ => self.reset(),
        }
    }

    /// Return to idle, dropping everything tied to the last execution
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Resolve where a submission goes while awaiting input
    pub fn route(&self) -> Result<RouteTarget, RoutingError> {
        match &self.pending_route_target {
            None => Err(RoutingError::NoTarget),
            Some(RouteTarget::ArtifactForm) if self.active_form().is_none() => {
                Err(RoutingError::NoActiveForm)
            }
            Some(target) => Ok(target.clone()),
        }
    }
}
