//! Streaming session controller
//!
//! A session connects one user-facing surface to an agent runtime. Input
//! goes in through a [`SessionHandle`], everything to show comes out of the
//! [`DisplayStream`].

mod actor;
mod builder;
mod config;
mod controller;
mod display;

pub use actor::SessionHandle;
pub use builder::SessionBuilder;
pub use config::SessionConfig;
pub use controller::SubmitOutcome;
pub use display::{DisplayEvent, DisplayStream, Speaker};
