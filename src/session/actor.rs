//! Session actor and its handle
//!
//! One task owns the [`Controller`] and with it the interaction state. User
//! commands, runtime events and finished runtime calls all arrive as
//! messages, so state is only ever touched from this task. Runtime calls run
//! on the dispatch runtime and never block the actor.

use futures::{stream::BoxStream, StreamExt};
use tokio::{
    runtime::Handle,
    sync::{
        mpsc::{self, error::TrySendError},
        oneshot,
    },
};
use tower::{util::BoxCloneService, ServiceExt};
use tracing::{debug, info_span, Instrument};

use crate::{
    error::{RuntimeError, SessionError},
    interaction::InteractionState,
    runtime::{AgentRuntime, ExecutionEvent},
    service::{RuntimeCall, RuntimeReply},
    session::{controller::Controller, DisplayEvent, SubmitOutcome},
};

const COMMAND_CAPACITY: usize = 64;

/// Tower stack executing runtime calls
pub(crate) type Dispatcher = BoxCloneService<RuntimeCall, RuntimeReply, RuntimeError>;

enum Command {
    Submit {
        text: String,
        reply: oneshot::Sender<SubmitOutcome>,
    },
    Cancel {
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<InteractionState>,
    },
    Shutdown,
}

struct DispatchDone {
    call: &'static str,
    generation: u64,
    result: Result<RuntimeReply, RuntimeError>,
}

/// Handle for talking to a running session
///
/// Handles are cheap to clone. The session stops when every handle is
/// dropped or [`SessionHandle::shutdown`] is called.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Submit user input
    ///
    /// Returns once the session has decided what to do with the input and,
    /// if needed, handed the runtime call off. It does not wait for the
    /// execution itself; progress arrives on the display stream.
    pub async fn submit(&self, text: impl Into<String>) -> Result<SubmitOutcome, SessionError> {
        let (reply, outcome) = oneshot::channel();
        self.send(Command::Submit {
            text: text.into(),
            reply,
        })
        .await?;
        outcome.await.map_err(|_| SessionError::Closed)
    }

    /// Ask the runtime to abandon the execution in flight
    ///
    /// Returns whether a cancel request was sent. The interaction state is
    /// unchanged; the runtime reports the outcome through its events.
    pub async fn cancel(&self) -> Result<bool, SessionError> {
        let (reply, sent) = oneshot::channel();
        self.send(Command::Cancel { reply }).await?;
        sent.await.map_err(|_| SessionError::Closed)
    }

    /// Copy of the current interaction state
    pub async fn snapshot(&self) -> Result<InteractionState, SessionError> {
        let (reply, state) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        state.await.map_err(|_| SessionError::Closed)
    }

    /// Stop the session; the display stream ends afterwards
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(Command::Shutdown).await
    }

    /// Check if the session has stopped
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Submit { text, .. } => f.debug_struct("Submit").field("text", text).finish(),
            Command::Cancel { .. } => f.write_str("Cancel"),
            Command::Snapshot { .. } => f.write_str("Snapshot"),
            Command::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Spawn the actor owning `controller` on the current runtime
pub(crate) fn spawn_session<R>(
    controller: Controller<R>,
    events: BoxStream<'static, ExecutionEvent>,
    dispatcher: Dispatcher,
    dispatch: Handle,
    display: mpsc::Sender<DisplayEvent>,
) -> SessionHandle
where
    R: AgentRuntime + ?Sized,
{
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);

    let actor = SessionActor {
        controller,
        dispatcher,
        dispatch,
        display,
    };
    tokio::spawn(actor.run(command_rx, events).instrument(info_span!("session")));

    SessionHandle {
        commands: command_tx,
    }
}

struct SessionActor<R: ?Sized> {
    controller: Controller<R>,
    dispatcher: Dispatcher,
    dispatch: Handle,
    display: mpsc::Sender<DisplayEvent>,
}

impl<R> SessionActor<R>
where
    R: AgentRuntime + ?Sized,
{
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        events: BoxStream<'static, ExecutionEvent>,
    ) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<DispatchDone>();
        let mut events = events.fuse();
        debug!("session started");

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if !self.handle_command(command, &done_tx).await {
                        break;
                    }
                }
                Some(event) = events.next() => {
                    self.controller.on_event(event);
                }
                Some(done) = done_rx.recv() => {
                    self.controller.on_dispatch(done.call, done.generation, done.result);
                }
            }

            self.flush().await;
        }

        self.flush().await;
        debug!("session stopped");
    }

    /// Returns false when the actor should stop
    async fn handle_command(
        &mut self,
        command: Command,
        done_tx: &mpsc::UnboundedSender<DispatchDone>,
    ) -> bool {
        match command {
            Command::Submit { text, reply } => {
                let (outcome, call) = self.controller.submit(&text);
                if let Some(call) = call {
                    self.spawn_dispatch(call, done_tx.clone());
                }
                // Notices for this submission are visible once it returns
                self.flush().await;
                let _ = reply.send(outcome);
            }
            Command::Cancel { reply } => {
                let call = self.controller.cancel_call();
                let sent = call.is_some();
                if let Some(call) = call {
                    self.spawn_dispatch(call, done_tx.clone());
                }
                let _ = reply.send(sent);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.controller.state().clone());
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn spawn_dispatch(&self, call: RuntimeCall, done_tx: mpsc::UnboundedSender<DispatchDone>) {
        let service = self.dispatcher.clone();
        let name = call.name();
        let generation = self.controller.generation();
        let span = info_span!("runtime_call", call = name, generation);

        self.dispatch.spawn(
            async move {
                let result = service.oneshot(call).await;
                // The actor may already be gone
                let _ = done_tx.send(DispatchDone {
                    call: name,
                    generation,
                    result,
                });
            }
            .instrument(span),
        );
    }

    /// Forward queued display events, skipping previews while the surface
    /// lags behind
    async fn flush(&mut self) {
        for event in self.controller.take_display() {
            let delivered = match event {
                DisplayEvent::Preview { .. } => match self.display.try_send(event) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        debug!("display stream full, skipping preview");
                        true
                    }
                    Err(TrySendError::Closed(_)) => false,
                },
                event => self.display.send(event).await.is_ok(),
            };

            if !delivered {
                debug!("display stream dropped, discarding events");
                break;
            }
        }
    }
}
