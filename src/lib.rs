//! # Artifact Relay
//!
//! Typed artifacts embedded in streamed agent output, and the session
//! machinery that turns them into interactive exchanges.
//!
//! An agent writes free-form text. Somewhere in that text it may place an
//! artifact: a JSON object tagged `"kind": "artifact"` describing a form or a
//! markdown report. This crate finds that object in the growing output,
//! validates it against a strict schema, and routes the user's reply back to
//! the part of the agent's execution graph that asked for it.
//!
//! ## Features
//!
//! - **Strict schema**: artifacts either validate completely or report every
//!   violated constraint
//! - **Streaming extraction**: a pure extractor that is safe to re-run on every
//!   delta and tells "not yet closed" apart from "broken"
//! - **Single-owner state**: one actor per session owns the interaction state;
//!   runtime calls run elsewhere and report back through messages
//! - **Composable dispatch**: runtime calls go through a Tower service stack
//!
//! ## Example
//!
//! ```rust,no_run
//! use artifact_relay::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let form = FormProps::new(
//!         "Confirm",
//!         vec![FormField::checkbox("ok", "OK")],
//!     )?;
//!     let artifact = Artifact::form("confirm", form)?;
//!
//!     let runtime = ScriptedRuntime::new()
//!         .with_entry_point(EntryPoint::new("main", "intake"))
//!         .with_script(Script::streamed(&artifact.to_json()?, 16));
//!
//!     let (session, mut display) = SessionBuilder::new(runtime).build();
//!     session.submit("deploy to staging").await?;
//!
//!     while let Some(event) = display.recv().await {
//!         if let DisplayEvent::ArtifactRendered { artifact, .. } = &event {
//!             for line in render_lines(artifact) {
//!                 println!("{line}");
//!             }
//!             break;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod extract;
pub mod interaction;
pub mod layer;
pub mod protocol;
pub mod render;
pub mod runtime;
pub mod service;
pub mod session;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        error::{RuntimeError, SessionError},
        extract::{extract, extract_final, ExtractError, Extraction},
        interaction::{InteractionState, Mode, RouteTarget},
        protocol::{
            Artifact, ArtifactResponse, ComponentKind, ComponentProps, FieldType, FormField,
            FormProps, ValidationError,
        },
        render::render_lines,
        runtime::{AgentRuntime, EntryPoint, ExecutionEvent, NodeSpec, Script, ScriptedRuntime},
        session::{DisplayEvent, SessionBuilder, SessionConfig, SessionHandle, Speaker, SubmitOutcome},
    };
}
