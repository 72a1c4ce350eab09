//! Tower Service implementations

pub mod core;
pub mod request;
pub mod response;

pub use core::RuntimeService;
pub use request::RuntimeCall;
pub use response::RuntimeReply;
