//! The agent runtime collaborator
//!
//! The session never schedules graph nodes itself. It triggers entry points,
//! injects replies into waiting nodes and consumes the runtime's event
//! stream. Anything implementing [`AgentRuntime`] can sit behind a session.

pub mod scripted;

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::RuntimeError;

pub use scripted::{Script, ScriptedRuntime};

/// Identifier of one execution, assigned by the runtime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Wrap an id issued by the runtime
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh time-ordered id
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the id is blank
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ExecutionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ExecutionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A named starting location in the execution graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryPoint {
    /// Entry point id passed to `trigger`
    pub id: String,

    /// Node the execution starts at
    pub entry_node: String,
}

impl EntryPoint {
    /// Create an entry point
    pub fn new(id: impl Into<String>, entry_node: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entry_node: entry_node.into(),
        }
    }
}

/// What the session needs to know about a graph node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeSpec {
    /// Node id
    pub id: String,

    /// Keys the node reads from its input map
    pub input_keys: Vec<String>,

    /// Whether execution pauses at this node for user input
    #[serde(default)]
    pub client_facing: bool,
}

impl NodeSpec {
    /// Create a node spec
    pub fn new<I, S>(id: impl Into<String>, input_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            input_keys: input_keys.into_iter().map(Into::into).collect(),
            client_facing: false,
        }
    }

    /// Mark the node as pausing for user input
    pub fn client_facing(mut self) -> Self {
        self.client_facing = true;
        self
    }
}

/// Event emitted by the runtime while an execution progresses
///
/// Events of one execution are delivered in production order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ExecutionEvent {
    /// Streamed model output; `snapshot` is the cumulative text so far
    TextDelta {
        /// Newly produced text
        token: String,

        /// All text produced by the execution so far
        snapshot: String,
    },

    /// A tool call started
    ToolStarted {
        /// Tool name
        tool_name: String,

        /// Tool arguments
        #[serde(default)]
        tool_input: Value,
    },

    /// A tool call finished
    ToolCompleted {
        /// Tool name
        tool_name: String,

        /// Tool output, or the error text
        result: String,

        /// Whether the tool failed
        #[serde(default)]
        is_error: bool,
    },

    /// The execution finished
    ExecutionCompleted {
        /// Final output payload
        #[serde(default)]
        output: Value,
    },

    /// The execution failed
    ExecutionFailed {
        /// Failure description
        error: String,
    },

    /// A node is waiting for user input
    InputRequested {
        /// The waiting node, if known
        #[serde(default)]
        node_id: Option<String>,
    },
}

impl ExecutionEvent {
    /// Name of the event kind, as used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionEvent::TextDelta { .. } => "text-delta",
            ExecutionEvent::ToolStarted { .. } => "tool-started",
            ExecutionEvent::ToolCompleted { .. } => "tool-completed",
            ExecutionEvent::ExecutionCompleted { .. } => "execution-completed",
            ExecutionEvent::ExecutionFailed { .. } => "execution-failed",
            ExecutionEvent::InputRequested { .. } => "input-requested",
        }
    }

    /// Split `text` into cumulative text-delta events of `chunk` characters
    pub fn text_deltas(text: &str, chunk: usize) -> Vec<ExecutionEvent> {
        let chars: Vec<char> = text.chars().collect();
        let mut snapshot = String::with_capacity(text.len());

        chars
            .chunks(chunk.max(1))
            .map(|piece| {
                let token: String = piece.iter().collect();
                snapshot.push_str(&token);
                ExecutionEvent::TextDelta {
                    token,
                    snapshot: snapshot.clone(),
                }
            })
            .collect()
    }
}

/// Agent runtime driven by a session
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentRuntime: Send + Sync + 'static {
    /// Registered entry points, in registration order
    fn entry_points(&self) -> Vec<EntryPoint>;

    /// Look up a graph node
    fn node(&self, id: &str) -> Option<NodeSpec>;

    /// Start an execution at an entry point
    async fn trigger(
        &self,
        entry_point_id: &str,
        input: Map<String, Value>,
    ) -> Result<ExecutionId, RuntimeError>;

    /// Deliver a value to a node waiting for input
    async fn inject_input(&self, node_id: &str, value: Value) -> Result<(), RuntimeError>;

    /// Stream of execution events
    fn subscribe(&self) -> BoxStream<'static, ExecutionEvent>;

    /// Ask the runtime to abandon an execution; runtimes may ignore this
    async fn cancel(&self, execution_id: &ExecutionId) -> Result<(), RuntimeError> {
        let _ = execution_id;
        Ok(())
    }
}
