//! Replies from the agent runtime

use crate::runtime::ExecutionId;

/// Reply to a [`RuntimeCall`](super::RuntimeCall)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeReply {
    /// An execution was started
    Triggered(ExecutionId),

    /// The reply was delivered to the waiting node
    Delivered,

    /// The cancel request was handed to the runtime
    CancelRequested,
}

impl RuntimeReply {
    /// Extract the execution id, if present
    pub fn into_execution_id(self) -> Option<ExecutionId> {
        match self {
            RuntimeReply::Triggered(id) => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_execution_id() {
        let reply = RuntimeReply::Triggered(ExecutionId::new("exec-1"));
        assert_eq!(reply.into_execution_id(), Some(ExecutionId::new("exec-1")));
        assert_eq!(RuntimeReply::Delivered.into_execution_id(), None);
    }
}
