//! Validation layer for runtime calls and replies

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tower_layer::Layer;
use tower_service::Service;

use crate::{
    error::RuntimeError,
    service::{RuntimeCall, RuntimeReply},
};

/// Layer that validates runtime calls and replies
#[derive(Clone, Debug, Default)]
pub struct CallValidationLayer;

impl CallValidationLayer {
    /// Create a new validation layer
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for CallValidationLayer {
    type Service = CallValidationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CallValidationService { inner }
    }
}

/// Validation service that wraps an inner service
#[derive(Clone)]
pub struct CallValidationService<S> {
    inner: S,
}

impl<S> CallValidationService<S> {
    /// Validate a runtime call
    fn validate_call(call: &RuntimeCall) -> Result<(), RuntimeError> {
        match call {
            RuntimeCall::Trigger {
                entry_point_id,
                input,
            } => {
                if entry_point_id.trim().is_empty() {
                    return Err(RuntimeError::InvalidCall(
                        "Entry point ID cannot be empty".into(),
                    ));
                }
                if input.is_empty() {
                    return Err(RuntimeError::InvalidCall(
                        "Trigger input must have at least one entry".into(),
                    ));
                }
            }
            RuntimeCall::InjectInput { node_id, .. } => {
                if node_id.trim().is_empty() {
                    return Err(RuntimeError::InvalidCall("Node ID cannot be empty".into()));
                }
            }
            RuntimeCall::Cancel { execution_id } => {
                if execution_id.is_empty() {
                    return Err(RuntimeError::InvalidCall(
                        "Execution ID cannot be empty".into(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Validate a runtime reply
    fn validate_reply(reply: &RuntimeReply) -> Result<(), RuntimeError> {
        if let RuntimeReply::Triggered(id) = reply {
            if id.is_empty() {
                return Err(RuntimeError::InvalidCall(
                    "Runtime returned an empty execution ID".into(),
                ));
            }
        }

        Ok(())
    }
}

impl<S> Service<RuntimeCall> for CallValidationService<S>
where
    S: Service<RuntimeCall, Response = RuntimeReply, Error = RuntimeError> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = RuntimeReply;
    type Error = RuntimeError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, call: RuntimeCall) -> Self::Future {
        if let Err(e) = Self::validate_call(&call) {
            return Box::pin(async move { Err(e) });
        }

        let mut inner = self.inner.clone();
        Box::pin(async move {
            let reply = inner.call(call).await?;
            Self::validate_reply(&reply)?;
            Ok(reply)
        })
    }
}
