//! Forward resolution: key to address.

use crate::descriptor::{EntityKindDescriptor, Layout};
use crate::error::{CoreError, CoreResult};
use crate::key::{Key, RecordAddress};
use crate::schema::{PathTemplate, Segment};

/// Resolves keys of one entity kind to addresses.
///
/// A key must supply exactly the properties the template references; anything
/// else is an `ArgumentMismatch`, which indicates a defect in the calling
/// code and is meant to propagate unchanged.
#[derive(Debug, Clone, Copy)]
pub struct AddressResolver<'d> {
    descriptor: &'d EntityKindDescriptor,
}

impl<'d> AddressResolver<'d> {
    /// Creates a resolver for `descriptor`.
    #[must_use]
    pub fn new(descriptor: &'d EntityKindDescriptor) -> Self {
        Self { descriptor }
    }

    /// Address of the record identified by `key`.
    ///
    /// Document kinds resolve to the record file, suffix included. Version
    /// directory kinds resolve to the container directory, ending with `/`.
    ///
    /// # Errors
    ///
    /// Returns `ArgumentMismatch` unless `key` names exactly the template's
    /// variables.
    pub fn resolve(&self, key: &Key) -> CoreResult<RecordAddress> {
        let mut path = self.render(self.descriptor.template(), key)?;
        match self.descriptor.layout() {
            Layout::Document { .. } => path.push_str(self.descriptor.format().suffix()),
            Layout::VersionDirectory => path.push('/'),
        }
        Ok(RecordAddress::new(path))
    }

    /// Address of one version file of a version directory kind.
    ///
    /// # Errors
    ///
    /// Returns `WrongLayout` for document kinds, or `ArgumentMismatch` as
    /// [`AddressResolver::resolve`].
    pub fn resolve_version(&self, key: &Key, version: u64) -> CoreResult<RecordAddress> {
        if self.descriptor.layout() != Layout::VersionDirectory {
            return Err(CoreError::WrongLayout {
                kind: self.descriptor.name().to_string(),
                expected: Layout::VersionDirectory.name(),
            });
        }
        let container = self.render(self.descriptor.template(), key)?;
        Ok(RecordAddress::new(format!(
            "{container}/{version}{}",
            self.descriptor.format().suffix()
        )))
    }

    /// Directory holding every instance that shares the parent `key`.
    ///
    /// `key` must supply exactly the listing template's variables; for a
    /// top-level kind that is the empty key.
    ///
    /// # Errors
    ///
    /// Returns `ArgumentMismatch` on any other key.
    pub fn resolve_listing_prefix(&self, key: &Key) -> CoreResult<RecordAddress> {
        self.render(self.descriptor.listing_template(), key)
            .map(RecordAddress::new)
    }

    fn render(&self, template: &PathTemplate, key: &Key) -> CoreResult<String> {
        let expected = template.variables();
        if key.len() != expected.len() || expected.iter().any(|name| key.get(name).is_none()) {
            return Err(CoreError::ArgumentMismatch {
                kind: self.descriptor.name().to_string(),
                template: template.source().to_string(),
                expected: expected.to_vec(),
                actual: key.names().map(str::to_string).collect(),
            });
        }

        let mut path = String::with_capacity(template.source().len() + 36 * expected.len());
        for segment in template.segments() {
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::DirectorySeparator => path.push('/'),
                Segment::Variable { name, .. } => {
                    if let Some(value) = key.get(name) {
                        path.push_str(&value.hyphenated().to_string());
                    }
                }
            }
        }
        Ok(path)
    }
}
