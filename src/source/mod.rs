//! Stream source selection and resolution

pub mod kind;
pub mod resolver;

pub use kind::{SourceKind, UnknownSource};
pub use resolver::SourceResolver;
