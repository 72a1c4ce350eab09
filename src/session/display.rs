//! Events sent to the rendering surface

use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream;
use tokio::sync::mpsc;

use crate::{interaction::Mode, protocol::Artifact};

/// Who a history line is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speaker {
    /// The person at the keyboard
    User,

    /// The agent's output
    Agent,

    /// Tool activity
    Tool,

    /// Session notices
    System,
}

impl Speaker {
    /// Label used when printing the line
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::User => "You",
            Speaker::Agent => "Agent",
            Speaker::Tool => "Tool",
            Speaker::System => "System",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Something the rendering surface should show
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    /// A permanent line in the conversation history
    HistoryLine {
        /// Who the line belongs to
        speaker: Speaker,

        /// Line content
        text: String,
    },

    /// Live, single-line preview of the streaming output
    Preview {
        /// Tail of the streamed text, newlines flattened
        text: String,

        /// Whether the stream appears to carry an artifact
        artifact_detected: bool,
    },

    /// A validated artifact to render
    ArtifactRendered {
        /// The artifact
        artifact: Artifact,

        /// Whether it replaces the active artifact with the same id
        replaces: bool,
    },

    /// A submission was rejected because an execution is running
    BusyNotice {
        /// Notice text
        message: String,
    },

    /// A failure the user should see
    ErrorNotice {
        /// Notice text
        message: String,
    },

    /// The interaction mode changed; input is enabled per [`Mode::accepts_input`]
    ModeChanged(Mode),
}

impl DisplayEvent {
    /// Create a history line
    pub fn line(speaker: Speaker, text: impl Into<String>) -> Self {
        DisplayEvent::HistoryLine {
            speaker,
            text: text.into(),
        }
    }

    /// Create an error notice
    pub fn error(message: impl Into<String>) -> Self {
        DisplayEvent::ErrorNotice {
            message: message.into(),
        }
    }
}

/// Stream of [`DisplayEvent`]s produced by one session
///
/// The stream is bounded. While it is full, [`DisplayEvent::Preview`]s are
/// skipped and every other event waits, pausing the session until the
/// surface catches up. The stream ends once the session actor stops.
#[derive(Debug)]
pub struct DisplayStream {
    receiver: mpsc::Receiver<DisplayEvent>,
}

impl DisplayStream {
    pub(crate) fn new(receiver: mpsc::Receiver<DisplayEvent>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event
    pub async fn recv(&mut self) -> Option<DisplayEvent> {
        self.receiver.recv().await
    }

    /// Take an event if one is ready
    pub fn try_recv(&mut self) -> Option<DisplayEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for DisplayStream {
    type Item = DisplayEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
