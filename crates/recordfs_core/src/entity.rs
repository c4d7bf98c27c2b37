//! Typed entity kinds: a descriptor plus per-record key extraction.

use crate::descriptor::{EntityKindDescriptor, Layout};
use crate::error::{CoreResult, DefinitionError};
use crate::key::{Key, RecordAddress};
use crate::schema::{PropertyDecl, PropertyKind};
use recordfs_codec::Format;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Reads one identifier property from a record.
pub type Accessor<R> = Arc<dyn Fn(&R) -> Uuid + Send + Sync>;

/// An entity kind bound to the record type `R`.
///
/// Pairs the shared [`EntityKindDescriptor`] with one accessor per template
/// variable, so the key of a live record can always be computed without
/// caller-supplied pairs.
///
/// # Example
///
/// ```rust
/// use recordfs_core::EntityKind;
/// use uuid::Uuid;
///
/// struct Subwidget {
///     widget_id: Uuid,
///     id: Uuid,
/// }
///
/// let kind = EntityKind::<Subwidget>::builder("subwidget", "/widgets/{widgetId}/subwidgets/{id}")
///     .uuid("widgetId", |s: &Subwidget| s.widget_id)
///     .uuid("id", |s: &Subwidget| s.id)
///     .build()
///     .unwrap();
///
/// let record = Subwidget { widget_id: Uuid::new_v4(), id: Uuid::new_v4() };
/// let parent = kind.resolve_parent_of(&record).unwrap();
/// assert_eq!(parent.as_str(), format!("/widgets/{}/subwidgets/", record.widget_id));
/// ```
pub struct EntityKind<R> {
    descriptor: Arc<EntityKindDescriptor>,
    accessors: Vec<(String, Accessor<R>)>,
}

impl<R> EntityKind<R> {
    /// Starts defining a kind named `name` stored at `template`.
    pub fn builder(name: impl Into<String>, template: impl Into<String>) -> EntityKindBuilder<R> {
        EntityKindBuilder {
            name: name.into(),
            template: template.into(),
            properties: Vec::new(),
            accessors: Vec::new(),
            format: Format::default(),
            layout: Layout::default(),
        }
    }

    /// Shared descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &Arc<EntityKindDescriptor> {
        &self.descriptor
    }

    /// Kind name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Key of `record`, in template order.
    #[must_use]
    pub fn key_of(&self, record: &R) -> Key {
        self.accessors
            .iter()
            .map(|(name, accessor)| (name.clone(), accessor(record)))
            .collect()
    }

    /// Address of `record`.
    ///
    /// # Errors
    ///
    /// Never returns `ArgumentMismatch`; the accessor table covers every
    /// template variable.
    pub fn resolve_instance(&self, record: &R) -> CoreResult<RecordAddress> {
        self.descriptor.resolver().resolve(&self.key_of(record))
    }

    /// Directory holding `record` and its siblings.
    ///
    /// # Errors
    ///
    /// Never returns `ArgumentMismatch`; see [`EntityKind::resolve_instance`].
    pub fn resolve_parent_of(&self, record: &R) -> CoreResult<RecordAddress> {
        let parent = self
            .key_of(record)
            .restrict(self.descriptor.listing_template().variables());
        self.descriptor.resolver().resolve_listing_prefix(&parent)
    }
}

impl<R> Clone for EntityKind<R> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            accessors: self.accessors.clone(),
        }
    }
}

impl<R> fmt::Debug for EntityKind<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityKind")
            .field("name", &self.descriptor.name())
            .field("template", &self.descriptor.template().source())
            .finish_non_exhaustive()
    }
}

/// Builder for [`EntityKind`].
pub struct EntityKindBuilder<R> {
    name: String,
    template: String,
    properties: Vec<PropertyDecl>,
    accessors: Vec<(String, Accessor<R>)>,
    format: Format,
    layout: Layout,
}

impl<R> EntityKindBuilder<R> {
    /// Declares a UUID property together with the accessor that reads it.
    #[must_use]
    pub fn uuid<F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&R) -> Uuid + Send + Sync + 'static,
    {
        let name = name.into();
        let accessor: Accessor<R> = Arc::new(accessor);
        self.properties.push(PropertyDecl::uuid(name.clone()));
        self.accessors.push((name, accessor));
        self
    }

    /// Declares a property that is not read for addressing.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, kind: PropertyKind) -> Self {
        self.properties.push(PropertyDecl::new(name, kind));
        self
    }

    /// Sets the record format.
    #[must_use]
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Sets the storage layout.
    #[must_use]
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Validates the definition.
    ///
    /// # Errors
    ///
    /// Returns the template's `DefinitionError`, or `MissingAccessor` if a
    /// template variable was declared with [`EntityKindBuilder::property`]
    /// instead of [`EntityKindBuilder::uuid`].
    pub fn build(self) -> Result<EntityKind<R>, DefinitionError> {
        let descriptor =
            EntityKindDescriptor::new(self.name, &self.template, self.properties, self.format, self.layout)?;

        let mut accessors = Vec::with_capacity(descriptor.template().variables().len());
        for variable in descriptor.template().variables() {
            let accessor = self
                .accessors
                .iter()
                .find(|(name, _)| name == variable)
                .map(|(_, accessor)| Arc::clone(accessor))
                .ok_or_else(|| DefinitionError::MissingAccessor {
                    kind: descriptor.name().to_string(),
                    name: variable.clone(),
                })?;
            accessors.push((variable.clone(), accessor));
        }

        Ok(EntityKind {
            descriptor: Arc::new(descriptor),
            accessors,
        })
    }
}
