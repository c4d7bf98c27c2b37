//! Address template parsing.

use super::property::{PropertyDecl, PropertyKind};
use crate::error::DefinitionError;
use std::fmt;

/// One parsed piece of an address template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, never containing `/`.
    Literal(String),
    /// A single `/`.
    DirectorySeparator,
    /// A placeholder bound to a declared property.
    Variable {
        /// Property name.
        name: String,
        /// Property type; always addressable.
        kind: PropertyKind,
    },
}

/// A validated address template such as `/widgets/{widgetId}/subwidgets/{id}`.
///
/// Construction fails fast on any malformed template, so a `PathTemplate`
/// is always internally consistent: every variable names a declared UUID
/// property exactly once.
///
/// A template without a leading `/` is treated as if it had one.
///
/// # Example
///
/// ```rust
/// use recordfs_core::{PathTemplate, PropertyDecl, Segment};
///
/// let props = [PropertyDecl::uuid("id")];
/// let template = PathTemplate::parse("/widgets/{id}", &props).unwrap();
/// assert_eq!(template.variables(), ["id"]);
/// assert_eq!(template.listing_source(), "/widgets/");
/// assert_eq!(template.segments()[1], Segment::Literal("widgets".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
    variables: Vec<String>,
}

impl PathTemplate {
    /// Parses and validates `template` against the declared `properties`.
    ///
    /// # Errors
    ///
    /// - `MalformedTemplate` if `{` and `}` counts differ
    /// - `InvalidPlaceholder` for nested, unopened or empty placeholders
    /// - `EmptySegment` for `//` or a trailing `/`
    /// - `UnknownProperty` if a placeholder names an undeclared property
    /// - `UnsupportedPropertyType` if it names a non-UUID property
    /// - `DuplicateVariable` if a property is referenced twice
    pub fn parse(template: &str, properties: &[PropertyDecl]) -> Result<Self, DefinitionError> {
        let source = if template.starts_with('/') {
            template.to_string()
        } else {
            format!("/{template}")
        };
        if source.ends_with('/') {
            return Err(DefinitionError::EmptySegment {
                position: source.len() - 1,
                template: source,
            });
        }
        Self::parse_source(source, properties)
    }

    fn parse_source(source: String, properties: &[PropertyDecl]) -> Result<Self, DefinitionError> {
        if let Some(position) = source.find("//") {
            return Err(DefinitionError::EmptySegment {
                template: source,
                position,
            });
        }

        let open = source.matches('{').count();
        let close = source.matches('}').count();
        if open != close {
            return Err(DefinitionError::MalformedTemplate {
                template: source,
                open,
                close,
            });
        }

        let mut segments = Vec::new();
        let mut variables: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut placeholder: Option<usize> = None;

        for (position, c) in source.char_indices() {
            match (c, placeholder) {
                ('{', None) => {
                    push_literal(&mut segments, &literal);
                    literal.clear();
                    placeholder = Some(position);
                }
                ('{', Some(_)) | ('}', None) => {
                    return Err(DefinitionError::InvalidPlaceholder {
                        template: source.clone(),
                        position,
                    });
                }
                ('}', Some(start)) => {
                    let name = &source[start + 1..position];
                    if name.is_empty() {
                        return Err(DefinitionError::InvalidPlaceholder {
                            template: source.clone(),
                            position: start,
                        });
                    }
                    let kind = lookup(&source, name, properties)?;
                    if variables.iter().any(|v| v == name) {
                        return Err(DefinitionError::DuplicateVariable {
                            template: source.clone(),
                            name: name.to_string(),
                        });
                    }
                    variables.push(name.to_string());
                    segments.push(Segment::Variable {
                        name: name.to_string(),
                        kind,
                    });
                    placeholder = None;
                }
                (_, Some(_)) => {}
                (_, None) => literal.push(c),
            }
        }
        push_literal(&mut segments, &literal);

        Ok(Self {
            source,
            segments,
            variables,
        })
    }

    /// The template text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed segments in source order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Variable names in template order.
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// The template truncated after its last `/`.
    ///
    /// This addresses the directory holding every instance that shares the
    /// same parent key, e.g. `/widgets/{widgetId}/subwidgets/`.
    #[must_use]
    pub fn listing_source(&self) -> &str {
        let end = self.source.rfind('/').map_or(0, |idx| idx + 1);
        &self.source[..end]
    }

    /// Parses the listing template with the same rules as the full one,
    /// except that it ends in `/`.
    ///
    /// # Errors
    ///
    /// Same as [`PathTemplate::parse`].
    pub fn listing(&self, properties: &[PropertyDecl]) -> Result<Self, DefinitionError> {
        Self::parse_source(self.listing_source().to_string(), properties)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn lookup(
    template: &str,
    name: &str,
    properties: &[PropertyDecl],
) -> Result<PropertyKind, DefinitionError> {
    let decl = properties
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| DefinitionError::UnknownProperty {
            template: template.to_string(),
            name: name.to_string(),
        })?;
    if !decl.kind.is_addressable() {
        return Err(DefinitionError::UnsupportedPropertyType {
            template: template.to_string(),
            name: name.to_string(),
            actual: decl.kind.name().to_string(),
        });
    }
    Ok(decl.kind)
}

/// Splits literal text on `/` into literal and separator segments.
fn push_literal(segments: &mut Vec<Segment>, text: &str) {
    let mut parts = text.split('/').peekable();
    while let Some(part) = parts.next() {
        if !part.is_empty() {
            segments.push(Segment::Literal(part.to_string()));
        }
        if parts.peek().is_some() {
            segments.push(Segment::DirectorySeparator);
        }
    }
}
