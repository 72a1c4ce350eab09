//! Core runtime service implementation

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use tower_service::Service;
use tracing::debug;

use crate::{
    error::RuntimeError,
    runtime::AgentRuntime,
    service::{RuntimeCall, RuntimeReply},
};

/// Service that executes [`RuntimeCall`]s against an [`AgentRuntime`]
///
/// This is the innermost service of the dispatch stack. It owns the call
/// timeout; validation and other policies are added as layers around it.
pub struct RuntimeService<R: ?Sized> {
    runtime: Arc<R>,
    timeout: Option<Duration>,
}

impl<R> RuntimeService<R>
where
    R: AgentRuntime + ?Sized,
{
    /// Create a new runtime service
    ///
    /// # Arguments
    ///
    /// * `runtime` - The runtime receiving the calls
    /// * `timeout` - Upper bound for a single call, `None` waits forever
    pub fn new(runtime: Arc<R>, timeout: Option<Duration>) -> Self {
        Self { runtime, timeout }
    }

    async fn execute(runtime: Arc<R>, call: RuntimeCall) -> Result<RuntimeReply, RuntimeError> {
        match call {
            RuntimeCall::Trigger {
                entry_point_id,
                input,
            } => {
                let id = runtime.trigger(&entry_point_id, input).await?;
                debug!(entry_point = %entry_point_id, execution_id = %id, "execution triggered");
                Ok(RuntimeReply::Triggered(id))
            }
            RuntimeCall::InjectInput { node_id, value } => {
                runtime.inject_input(&node_id, value).await?;
                debug!(node_id = %node_id, "input delivered");
                Ok(RuntimeReply::Delivered)
            }
            RuntimeCall::Cancel { execution_id } => {
                runtime.cancel(&execution_id).await?;
                debug!(execution_id = %execution_id, "cancel requested");
                Ok(RuntimeReply::CancelRequested)
            }
        }
    }
}

impl<R> Service<RuntimeCall> for RuntimeService<R>
where
    R: AgentRuntime + ?Sized,
{
    type Response = RuntimeReply;
    type Error = RuntimeError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: RuntimeCall) -> Self::Future {
        let runtime = self.runtime.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let execution = Self::execute(runtime, call);
            match timeout {
                Some(limit) => tokio::time::timeout(limit, execution)
                    .await
                    .map_err(|_| RuntimeError::Timeout)?,
                None => execution.await,
            }
        })
    }
}

impl<R: ?Sized> Clone for RuntimeService<R> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            timeout: self.timeout,
        }
    }
}
