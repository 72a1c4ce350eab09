//! Calls dispatched to the agent runtime

use serde_json::{Map, Value};

use crate::runtime::ExecutionId;

/// A call into the agent runtime
///
/// Calls are built by the session controller and executed off the session
/// actor by a [`RuntimeService`](super::RuntimeService) stack.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeCall {
    /// Start a new execution
    Trigger {
        /// Entry point to start at
        entry_point_id: String,

        /// Input map handed to the entry node
        input: Map<String, Value>,
    },

    /// Deliver a reply to a waiting node
    InjectInput {
        /// Node waiting for input
        node_id: String,

        /// The reply
        value: Value,
    },

    /// Best-effort request to abandon an execution
    Cancel {
        /// Execution to abandon
        execution_id: ExecutionId,
    },
}

impl RuntimeCall {
    /// Create a trigger call with a single input entry
    pub fn trigger(
        entry_point_id: impl Into<String>,
        input_key: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let mut input = Map::new();
        input.insert(input_key.into(), Value::String(text.into()));
        RuntimeCall::Trigger {
            entry_point_id: entry_point_id.into(),
            input,
        }
    }

    /// Create an inject call
    pub fn inject(node_id: impl Into<String>, value: impl Into<Value>) -> Self {
        RuntimeCall::InjectInput {
            node_id: node_id.into(),
            value: value.into(),
        }
    }

    /// Name of the call, as used in logs
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeCall::Trigger { .. } => "trigger",
            RuntimeCall::InjectInput { .. } => "inject_input",
            RuntimeCall::Cancel { .. } => "cancel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_builds_input_map() {
        let call = RuntimeCall::trigger("main", "request", "deploy to staging");

        let RuntimeCall::Trigger {
            entry_point_id,
            input,
        } = &call
        else {
            panic!("expected trigger");
        };
        assert_eq!(entry_point_id, "main");
        assert_eq!(input["request"], "deploy to staging");
        assert_eq!(call.name(), "trigger");
    }

    #[test]
    fn test_inject_call() {
        let call = RuntimeCall::inject("review", "approved");
        assert_eq!(
            call,
            RuntimeCall::InjectInput {
                node_id: "review".into(),
                value: Value::String("approved".into()),
            }
        );
        assert_eq!(call.name(), "inject_input");
    }
}
