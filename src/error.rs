//! Errors raised while driving the agent runtime and the session actor

use thiserror::Error;

/// Failure of a call into the agent runtime
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The runtime exposes no entry points to trigger
    #[error("runtime has no entry points")]
    NoEntryPoints,

    /// The configured entry point is not registered
    #[error("entry point not found: {0}")]
    EntryPointNotFound(String),

    /// The call was rejected before reaching the runtime
    #[error("invalid runtime call: {0}")]
    InvalidCall(String),

    /// The runtime did not answer within the configured timeout
    #[error("runtime call timed out")]
    Timeout,

    /// The runtime itself reported a failure
    #[error("runtime call failed: {0}")]
    Call(String),
}

/// Failure of a session handle operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The session actor has stopped
    #[error("session is closed")]
    Closed,
}
