//! Declared properties of an entity kind.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of a declared property.
///
/// Only [`PropertyKind::Uuid`] properties may appear in an address template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    /// A UUID identifier.
    Uuid,
    /// Free text.
    Text,
    /// A signed integer.
    Integer,
    /// A boolean flag.
    Boolean,
    /// A point in time.
    Timestamp,
}

impl PropertyKind {
    /// Lowercase type name used in messages and schema files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uuid => "uuid",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
        }
    }

    /// Whether properties of this type can be template variables.
    #[must_use]
    pub const fn is_addressable(self) -> bool {
        matches!(self, Self::Uuid)
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A property declared by an entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyDecl {
    /// Property name as it appears in templates.
    pub name: String,
    /// Property type.
    pub kind: PropertyKind,
}

impl PropertyDecl {
    /// Creates a property declaration.
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Shorthand for a UUID property.
    pub fn uuid(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Uuid)
    }
}
