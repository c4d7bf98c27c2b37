//! Full-match recognition of record paths.

use crate::descriptor::Layout;
use crate::error::DefinitionError;
use crate::schema::{PathTemplate, Segment};
use recordfs_codec::Format;
use regex::Regex;

/// Canonical 8-4-4-4-12 hexadecimal grouping.
const UUID_PATTERN: &str =
    "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}";

/// Version file stem: no leading zeros.
const VERSION_PATTERN: &str = "0|[1-9][0-9]*";

/// Recognizes the paths that are records of one entity kind.
///
/// The expressions are anchored at both ends, so anything that is not exactly
/// one record is rejected: hidden files, editor and sync temp files, paths
/// one level too shallow or deep, and identifiers with a single bad
/// character.
///
/// For [`Layout::VersionDirectory`] kinds a record is one version file,
/// `<container>/<n><suffix>`, and a second expression recognizes the
/// containers themselves.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    record: Regex,
    container: Option<Regex>,
    variables: usize,
}

impl PatternMatcher {
    /// Compiles the matcher for `template`.
    ///
    /// # Errors
    ///
    /// Returns `PatternCompile` if the regex engine rejects the expression.
    pub fn new(template: &PathTemplate, format: Format, layout: Layout) -> Result<Self, DefinitionError> {
        let body = body_pattern(template);
        let suffix = regex::escape(format.suffix());

        let (record, container) = match layout {
            Layout::Document { .. } => (format!("^{body}{suffix}$"), None),
            Layout::VersionDirectory => (
                format!("^{body}/(?P<version>{VERSION_PATTERN}){suffix}$"),
                Some(format!("^{body}/?$")),
            ),
        };

        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| DefinitionError::PatternCompile {
                template: template.source().to_string(),
                message: e.to_string(),
            })
        };

        Ok(Self {
            record: compile(&record)?,
            container: container.as_deref().map(compile).transpose()?,
            variables: template.variables().len(),
        })
    }

    /// Whether `path` is exactly one record of this kind.
    #[must_use]
    pub fn is_record(&self, path: &str) -> bool {
        self.record.is_match(path)
    }

    /// Raw variable captures of `path` in template order, or `None` if it is
    /// not a record.
    #[must_use]
    pub fn captures<'p>(&self, path: &'p str) -> Option<Vec<&'p str>> {
        collect_captures(&self.record, path, self.variables)
    }

    /// Raw variable captures of a path already known to be a record.
    ///
    /// # Panics
    ///
    /// Panics if [`PatternMatcher::is_record`] is false for `path`; calling
    /// this on anything else is a programming error.
    #[must_use]
    pub fn extract_captures(&self, path: &str) -> Vec<String> {
        match self.captures(path) {
            Some(captures) => captures.into_iter().map(str::to_string).collect(),
            None => panic!("extract_captures called on non-matching path {path}"),
        }
    }

    /// Version number of a version file path.
    ///
    /// `None` for paths that are not version files of this kind, or whose
    /// number does not fit in a `u64`.
    #[must_use]
    pub fn version_of(&self, path: &str) -> Option<u64> {
        self.record.captures(path)?.name("version")?.as_str().parse().ok()
    }

    /// Whether `path` is a version container of this kind.
    ///
    /// Always false for document kinds.
    #[must_use]
    pub fn is_container(&self, path: &str) -> bool {
        self.container.as_ref().is_some_and(|re| re.is_match(path))
    }

    /// Raw variable captures of a version container path.
    #[must_use]
    pub fn container_captures<'p>(&self, path: &'p str) -> Option<Vec<&'p str>> {
        collect_captures(self.container.as_ref()?, path, self.variables)
    }

    /// The record expression, for diagnostics.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.record.as_str()
    }
}

fn body_pattern(template: &PathTemplate) -> String {
    let mut pattern = String::new();
    for segment in template.segments() {
        match segment {
            Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
            Segment::DirectorySeparator => pattern.push('/'),
            Segment::Variable { .. } => {
                pattern.push('(');
                pattern.push_str(UUID_PATTERN);
                pattern.push(')');
            }
        }
    }
    pattern
}

fn collect_captures<'p>(re: &Regex, path: &'p str, variables: usize) -> Option<Vec<&'p str>> {
    let caps = re.captures(path)?;
    (1..=variables)
        .map(|i| caps.get(i).map(|m| m.as_str()))
        .collect()
}
