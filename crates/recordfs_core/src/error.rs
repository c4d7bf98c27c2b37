//! Error types for recordfs core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while defining an entity kind.
///
/// These only occur at registration time and indicate a defect in the
/// schema. They are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// The template has a different number of `{` and `}`.
    #[error("malformed template {template}: {open} '{{' but {close} '}}'")]
    MalformedTemplate {
        /// The offending template.
        template: String,
        /// Number of `{`.
        open: usize,
        /// Number of `}`.
        close: usize,
    },

    /// Brackets are balanced but a placeholder is nested, unopened or empty.
    #[error("invalid placeholder in template {template} at byte {position}")]
    InvalidPlaceholder {
        /// The offending template.
        template: String,
        /// Byte offset of the offending bracket.
        position: usize,
    },

    /// The template has an empty path component, either `//` or a trailing `/`.
    #[error("empty path component in template {template} at byte {position}")]
    EmptySegment {
        /// The offending template.
        template: String,
        /// Byte offset of the `/` that opens the empty component.
        position: usize,
    },

    /// A placeholder names a property the kind does not declare.
    #[error("template {template} references unknown property: {name}")]
    UnknownProperty {
        /// The offending template.
        template: String,
        /// The unknown property name.
        name: String,
    },

    /// A placeholder names a property whose type cannot appear in a path.
    #[error("template {template} references property {name} of type {actual}; only uuid is supported")]
    UnsupportedPropertyType {
        /// The offending template.
        template: String,
        /// The property name.
        name: String,
        /// The declared type of the property.
        actual: String,
    },

    /// The same placeholder appears twice.
    #[error("template {template} references property {name} more than once")]
    DuplicateVariable {
        /// The offending template.
        template: String,
        /// The repeated property name.
        name: String,
    },

    /// The compiled matcher was rejected by the regex engine.
    #[error("cannot compile matcher for template {template}: {message}")]
    PatternCompile {
        /// The offending template.
        template: String,
        /// The regex engine's message.
        message: String,
    },

    /// A kind with the same name is already registered.
    #[error("entity kind already registered: {name}")]
    DuplicateKind {
        /// The kind name.
        name: String,
    },

    /// A template variable has no accessor to read it from a record.
    #[error("entity kind {kind} has no accessor for template property {name}")]
    MissingAccessor {
        /// The kind name.
        kind: String,
        /// The property lacking an accessor.
        name: String,
    },
}

/// Errors that can occur in recordfs core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity kind definition error.
    #[error("definition error: {0}")]
    Definition(#[from] DefinitionError),

    /// The key does not supply exactly the properties the template needs.
    #[error(
        "key properties for {kind} do not match template {template}: expected [{}], actual [{}]",
        .expected.join(", "),
        .actual.join(", ")
    )]
    ArgumentMismatch {
        /// The entity kind being resolved.
        kind: String,
        /// The template being resolved.
        template: String,
        /// Property names the template references, in template order.
        expected: Vec<String>,
        /// Property names the caller supplied, in supplied order.
        actual: Vec<String>,
    },

    /// Captured text is not a valid identifier.
    #[error("invalid key for {kind}: {message}")]
    InvalidKey {
        /// The entity kind being decoded.
        kind: String,
        /// Description of the failure.
        message: String,
    },

    /// A record, version or version directory does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The address that was looked up.
        path: String,
    },

    /// Stored bytes exist but cannot be turned into typed content.
    #[error("read failure: {message}")]
    ReadFailure {
        /// Description of the failure.
        message: String,
        /// The underlying decode error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A new version could not be published after repeated collisions.
    #[error("version conflict at {path} after {attempts} attempts")]
    VersionConflict {
        /// The version container.
        path: String,
        /// Number of publish attempts made.
        attempts: u32,
    },

    /// The operation does not apply to the kind's storage layout.
    #[error("entity kind {kind} does not use the {expected} layout")]
    WrongLayout {
        /// The entity kind.
        kind: String,
        /// The layout the operation requires.
        expected: &'static str,
    },

    /// No entity kind with this name is registered.
    #[error("unknown entity kind: {name}")]
    UnknownKind {
        /// The requested name.
        name: String,
    },

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] recordfs_storage::StorageError),

    /// Content codec error.
    #[error("codec error: {0}")]
    Codec(#[from] recordfs_codec::CodecError),
}

impl CoreError {
    /// Creates a not found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a read failure without an underlying cause.
    pub fn read_failure(message: impl Into<String>) -> Self {
        Self::ReadFailure {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a read failure wrapping the error that caused it.
    pub fn read_failure_caused_by(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ReadFailure {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidKey {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Creates an unknown kind error.
    pub fn unknown_kind(name: impl Into<String>) -> Self {
        Self::UnknownKind { name: name.into() }
    }

    /// Returns whether this error means "nothing there".
    ///
    /// Storage-level not found errors count as well.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Storage(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Returns whether this error means stored content could not be decoded.
    #[must_use]
    pub fn is_read_failure(&self) -> bool {
        matches!(self, Self::ReadFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recordfs_storage::StorageError;

    #[test]
    fn argument_mismatch_lists_both_sides() {
        let err = CoreError::ArgumentMismatch {
            kind: "widget".into(),
            template: "/widgets/{id}".into(),
            expected: vec!["id".into()],
            actual: vec![],
        };
        assert_eq!(
            err.to_string(),
            "key properties for widget do not match template /widgets/{id}: expected [id], actual []"
        );
    }

    #[test]
    fn malformed_template_reports_counts() {
        let err = DefinitionError::MalformedTemplate {
            template: "/widgets/{id".into(),
            open: 1,
            close: 0,
        };
        assert_eq!(err.to_string(), "malformed template /widgets/{id: 1 '{' but 0 '}'");
    }

    #[test]
    fn not_found_includes_storage() {
        assert!(CoreError::not_found("/a").is_not_found());
        assert!(CoreError::from(StorageError::not_found("/a")).is_not_found());
        assert!(!CoreError::read_failure("bad").is_not_found());
    }

    #[test]
    fn read_failure_keeps_source() {
        use std::error::Error as _;
        let cause = recordfs_codec::CodecError::decoding_failed("eof");
        let err = CoreError::read_failure_caused_by("cannot decode /a", cause);
        assert!(err.is_read_failure());
        assert!(err.source().is_some());
    }
}
