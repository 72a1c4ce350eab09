//! Session builder for wiring a runtime to a session actor

use std::{sync::Arc, time::Duration};

use tokio::{runtime::Handle, sync::mpsc};
use tower::{util::BoxCloneService, ServiceBuilder};
use tracing::debug;

use crate::{
    layer::CallValidationLayer,
    runtime::AgentRuntime,
    service::RuntimeService,
    session::{
        actor::{spawn_session, Dispatcher},
        controller::Controller,
        DisplayStream, SessionConfig, SessionHandle,
    },
};

/// Builder for interactive sessions
///
/// # Example
///
/// ```rust,no_run
/// use artifact_relay::prelude::*;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let runtime = ScriptedRuntime::new()
///     .with_entry_point(EntryPoint::new("main", "intake"))
///     .with_script(Script::streamed("Sure, deploying...", 8));
///
/// let (session, mut display) = SessionBuilder::new(runtime).build();
/// session.submit("deploy to staging").await?;
///
/// while let Some(event) = display.recv().await {
///     println!("{event:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder<R: ?Sized> {
    runtime: Arc<R>,
    config: SessionConfig,
}

impl<R: AgentRuntime> SessionBuilder<R> {
    /// Start building a session around `runtime`
    pub fn new(runtime: R) -> Self {
        Self::from_shared(Arc::new(runtime))
    }
}

impl<R> SessionBuilder<R>
where
    R: AgentRuntime + ?Sized,
{
    /// Start building a session around a shared runtime
    pub fn from_shared(runtime: Arc<R>) -> Self {
        Self {
            runtime,
            config: SessionConfig::default(),
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Trigger this entry point instead of the first registered one
    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.config.entry_point = Some(entry_point.into());
        self
    }

    /// Set the node receiving form responses
    pub fn with_form_response_node(mut self, node_id: impl Into<String>) -> Self {
        self.config.form_response_node = node_id.into();
        self
    }

    /// Set the runtime call timeout
    ///
    /// # Arguments
    ///
    /// * `timeout` - The timeout for a single runtime call (default: none)
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = Some(timeout);
        self
    }

    /// Wait for runtime calls without a timeout
    pub fn without_call_timeout(mut self) -> Self {
        self.config.call_timeout = None;
        self
    }

    /// Run runtime calls on a dedicated tokio runtime
    pub fn with_dispatch(mut self, handle: Handle) -> Self {
        self.config.dispatch = Some(handle);
        self
    }

    /// Set how many display events are buffered for the surface
    pub fn with_display_capacity(mut self, capacity: usize) -> Self {
        self.config.display_capacity = capacity.max(1);
        self
    }

    /// Spawn the session actor
    ///
    /// Must be called from within a tokio runtime. The runtime's event
    /// stream is subscribed before this returns, so no event of a later
    /// execution is missed.
    ///
    /// # Returns
    ///
    /// The handle for submitting input and the stream of display events
    pub fn build(self) -> (SessionHandle, DisplayStream) {
        let dispatch = self
            .config
            .dispatch
            .clone()
            .unwrap_or_else(Handle::current);

        let dispatcher: Dispatcher = BoxCloneService::new(
            ServiceBuilder::new()
                .layer(CallValidationLayer::new())
                .service(RuntimeService::new(
                    self.runtime.clone(),
                    self.config.call_timeout,
                )),
        );

        let events = self.runtime.subscribe();
        let (display_tx, display_rx) = mpsc::channel(self.config.display_capacity.max(1));
        debug!(
            entry_point = ?self.config.entry_point,
            timeout = ?self.config.call_timeout,
            "building session"
        );

        let controller = Controller::new(self.runtime, self.config);
        let handle = spawn_session(controller, events, dispatcher, dispatch, display_tx);

        (handle, DisplayStream::new(display_rx))
    }
}
