//! Artifact protocol types and definitions

pub mod artifact;
pub mod error;
pub mod form;
pub mod response;
pub mod schema;

pub use artifact::{
    Artifact, ChartProps, CodeSandboxProps, ComponentKind, ComponentProps, MarkdownProps,
};
pub use error::{FormResponseError, ValidationError, Violation};
pub use form::{FieldType, FieldValue, FormField, FormProps};
pub use response::ArtifactResponse;
