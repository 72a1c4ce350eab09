//! In-memory runtime that replays scripted executions
//!
//! Each `trigger` or `inject_input` call consumes the next queued [`Script`]
//! and replays its events on a background task. Calls are recorded so tests
//! can assert on what the session dispatched.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use serde_json::{json, Map, Value};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use super::{AgentRuntime, EntryPoint, ExecutionEvent, ExecutionId, NodeSpec};
use crate::{error::RuntimeError, service::RuntimeCall};

const EVENT_CAPACITY: usize = 256;

/// What the runtime does in response to one call
#[derive(Debug, Clone, PartialEq)]
pub enum Script {
    /// Accept the call and emit these events
    Events(Vec<ExecutionEvent>),

    /// Reject the call itself with this message
    Fail(String),
}

impl Script {
    /// Accept the call and emit `events`
    pub fn events(events: impl IntoIterator<Item = ExecutionEvent>) -> Self {
        Script::Events(events.into_iter().collect())
    }

    /// Stream `text` in chunks of `chunk` characters, then complete
    pub fn streamed(text: &str, chunk: usize) -> Self {
        let mut events = ExecutionEvent::text_deltas(text, chunk);
        events.push(ExecutionEvent::ExecutionCompleted {
            output: json!({ "output_string": text }),
        });
        Script::Events(events)
    }

    /// Stream `text`, then pause for input at `node_id`
    pub fn asks(text: &str, chunk: usize, node_id: Option<&str>) -> Self {
        let mut events = ExecutionEvent::text_deltas(text, chunk);
        events.push(ExecutionEvent::InputRequested {
            node_id: node_id.map(str::to_string),
        });
        Script::Events(events)
    }

    /// Reject the call with `message`
    pub fn fail(message: impl Into<String>) -> Self {
        Script::Fail(message.into())
    }

    /// Append an event to an accepting script
    pub fn then(mut self, event: ExecutionEvent) -> Self {
        if let Script::Events(events) = &mut self {
            events.push(event);
        }
        self
    }
}

/// Scripted [`AgentRuntime`] for tests and demos
#[derive(Clone)]
pub struct ScriptedRuntime {
    entry_points: Vec<EntryPoint>,
    nodes: HashMap<String, NodeSpec>,
    scripts: Arc<Mutex<VecDeque<Script>>>,
    calls: Arc<Mutex<Vec<RuntimeCall>>>,
    events: broadcast::Sender<ExecutionEvent>,
    event_delay: Duration,
}

impl ScriptedRuntime {
    /// Create a runtime without entry points or scripts
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entry_points: Vec::new(),
            nodes: HashMap::new(),
            scripts: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            events,
            event_delay: Duration::ZERO,
        }
    }

    /// Register an entry point
    pub fn with_entry_point(mut self, entry_point: EntryPoint) -> Self {
        self.entry_points.push(entry_point);
        self
    }

    /// Register a node
    pub fn with_node(mut self, node: NodeSpec) -> Self {
        self.nodes.insert(node.id.clone(), node);
        self
    }

    /// Queue a script
    pub fn with_script(self, script: Script) -> Self {
        self.push_script(script);
        self
    }

    /// Pause between replayed events
    pub fn with_event_delay(mut self, delay: Duration) -> Self {
        self.event_delay = delay;
        self
    }

    /// Queue a script on a shared runtime
    pub fn push_script(&self, script: Script) {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(script);
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of scripts not yet consumed
    pub fn pending_scripts(&self) -> usize {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn record(&self, call: RuntimeCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn next_script(&self) -> Result<Vec<ExecutionEvent>, RuntimeError> {
        let script = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match script {
            Some(Script::Events(events)) => Ok(events),
            Some(Script::Fail(message)) => Err(RuntimeError::Call(message)),
            None => Err(RuntimeError::Call("no script queued".into())),
        }
    }

    fn replay(&self, events: Vec<ExecutionEvent>) {
        let sender = self.events.clone();
        let delay = self.event_delay;

        tokio::spawn(async move {
            for event in events {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                debug!(event = event.kind(), "replaying event");
                // No subscribers is not an error for a replay
                let _ = sender.send(event);
            }
        });
    }
}

impl Default for ScriptedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentRuntime for ScriptedRuntime {
    fn entry_points(&self) -> Vec<EntryPoint> {
        self.entry_points.clone()
    }

    fn node(&self, id: &str) -> Option<NodeSpec> {
        self.nodes.get(id).cloned()
    }

    async fn trigger(
        &self,
        entry_point_id: &str,
        input: Map<String, Value>,
    ) -> Result<ExecutionId, RuntimeError> {
        if !self.entry_points.iter().any(|ep| ep.id == entry_point_id) {
            return Err(RuntimeError::EntryPointNotFound(entry_point_id.to_string()));
        }

        self.record(RuntimeCall::Trigger {
            entry_point_id: entry_point_id.to_string(),
            input,
        });
        let events = self.next_script()?;
        let id = ExecutionId::generate();
        self.replay(events);
        Ok(id)
    }

    async fn inject_input(&self, node_id: &str, value: Value) -> Result<(), RuntimeError> {
        self.record(RuntimeCall::InjectInput {
            node_id: node_id.to_string(),
            value,
        });
        let events = self.next_script()?;
        self.replay(events);
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, ExecutionEvent> {
        let receiver = self.events.subscribe();
        stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event subscriber lagged behind");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }

    async fn cancel(&self, execution_id: &ExecutionId) -> Result<(), RuntimeError> {
        self.record(RuntimeCall::Cancel {
            execution_id: execution_id.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    fn runtime() -> ScriptedRuntime {
        ScriptedRuntime::new()
            .with_entry_point(EntryPoint::new("main", "intake"))
            .with_node(NodeSpec::new("intake", ["request"]))
    }

    #[tokio::test]
    async fn test_trigger_replays_script() {
        let runtime = runtime().with_script(Script::streamed("hello", 2));
        let mut events = runtime.subscribe();

        let mut input = Map::new();
        input.insert("request".into(), json!("hi"));
        let id = runtime.trigger("main", input).await.unwrap();
        assert!(!id.is_empty());

        let mut kinds = Vec::new();
        for _ in 0..4 {
            kinds.push(events.next().await.unwrap().kind());
        }
        assert_eq!(
            kinds,
            ["text-delta", "text-delta", "text-delta", "execution-completed"]
        );
        assert_eq!(runtime.pending_scripts(), 0);
    }

    #[tokio::test]
    async fn test_unknown_entry_point() {
        let err = runtime().trigger("other", Map::new()).await.unwrap_err();
        assert_eq!(err, RuntimeError::EntryPointNotFound("other".into()));
    }

    #[tokio::test]
    async fn test_failing_script_and_empty_queue() {
        let runtime = runtime().with_script(Script::fail("model offline"));

        let err = runtime.inject_input("intake", json!("x")).await.unwrap_err();
        assert_eq!(err, RuntimeError::Call("model offline".into()));

        let err = runtime.inject_input("intake", json!("y")).await.unwrap_err();
        assert_eq!(err, RuntimeError::Call("no script queued".into()));
        assert_eq!(runtime.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_calls_are_recorded() {
        let runtime = runtime();
        runtime.cancel(&ExecutionId::new("exec-1")).await.unwrap();

        assert_eq!(
            runtime.calls(),
            vec![RuntimeCall::Cancel {
                execution_id: ExecutionId::new("exec-1")
            }]
        );
        assert_eq!(runtime.node("intake").unwrap().input_keys, vec!["request"]);
        assert!(runtime.node("missing").is_none());
    }

    #[test]
    fn test_script_builders() {
        let script = Script::asks("Which env?", 100, Some("review"));
        let Script::Events(events) = &script else {
            panic!("expected events");
        };
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            ExecutionEvent::InputRequested {
                node_id: Some("review".into())
            }
        );

        let failed = Script::fail("boom").then(ExecutionEvent::ExecutionFailed {
            error: "ignored".into(),
        });
        assert_eq!(failed, Script::Fail("boom".into()));
    }
}
