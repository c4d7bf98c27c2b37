//! Declarative schema pieces: properties and address templates.

mod property;
mod template;

pub use property::{PropertyDecl, PropertyKind};
pub use template::{PathTemplate, Segment};
