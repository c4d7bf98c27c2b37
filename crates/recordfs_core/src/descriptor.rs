//! Immutable per-kind definitions.

use crate::error::DefinitionError;
use crate::listing::ListingPlan;
use crate::matcher::PatternMatcher;
use crate::resolver::AddressResolver;
use crate::schema::{PathTemplate, PropertyDecl};
use recordfs_codec::Format;
use serde::{Deserialize, Serialize};

/// How the records of a kind are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layout {
    /// One file per instance at the resolved address.
    ///
    /// With `history`, every write moves the previous snapshot into a
    /// `history` array embedded in the same document.
    Document {
        /// Whether to keep prior snapshots inside the document.
        #[serde(default)]
        history: bool,
    },
    /// One directory per instance holding one file per version, named
    /// `<n><suffix>`. The current version is the numerically highest file.
    VersionDirectory,
}

impl Layout {
    /// Short layout name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Document { .. } => "document",
            Self::VersionDirectory => "version_directory",
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::Document { history: false }
    }
}

/// Everything recordfs knows about one entity kind.
///
/// Built and validated once, at registration, then shared read-only. The
/// listing plan and compiled matcher are derived eagerly here, so resolution
/// and matching never compute anything lazily.
///
/// # Example
///
/// ```rust
/// use recordfs_codec::Format;
/// use recordfs_core::{EntityKindDescriptor, Key, Layout, PropertyDecl};
/// use uuid::Uuid;
///
/// let widgets = EntityKindDescriptor::new(
///     "widget",
///     "/widgets/{id}",
///     vec![PropertyDecl::uuid("id")],
///     Format::Json,
///     Layout::default(),
/// )
/// .unwrap();
///
/// let id = Uuid::parse_str("1f30d7b6-0296-489a-9615-55868aeef78a").unwrap();
/// let address = widgets.resolver().resolve(&Key::new().with("id", id)).unwrap();
/// assert_eq!(address.as_str(), "/widgets/1f30d7b6-0296-489a-9615-55868aeef78a.json");
/// ```
#[derive(Debug, Clone)]
pub struct EntityKindDescriptor {
    name: String,
    properties: Vec<PropertyDecl>,
    template: PathTemplate,
    listing: PathTemplate,
    plan: ListingPlan,
    matcher: PatternMatcher,
    format: Format,
    layout: Layout,
}

impl EntityKindDescriptor {
    /// Validates `template` against `properties` and derives the matcher and
    /// listing plan.
    ///
    /// # Errors
    ///
    /// Returns the `DefinitionError` of the first problem found in the
    /// template or its listing template.
    pub fn new(
        name: impl Into<String>,
        template: &str,
        properties: Vec<PropertyDecl>,
        format: Format,
        layout: Layout,
    ) -> Result<Self, DefinitionError> {
        let template = PathTemplate::parse(template, &properties)?;
        let listing = template.listing(&properties)?;
        let plan = ListingPlan::for_template(&template);
        let matcher = PatternMatcher::new(&template, format, layout)?;
        Ok(Self {
            name: name.into(),
            properties,
            template,
            listing,
            plan,
            matcher,
            format,
            layout,
        })
    }

    /// Kind name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared properties.
    #[must_use]
    pub fn properties(&self) -> &[PropertyDecl] {
        &self.properties
    }

    /// Parsed address template.
    #[must_use]
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// Parsed listing template.
    #[must_use]
    pub fn listing_template(&self) -> &PathTemplate {
        &self.listing
    }

    /// Bounded traversal plan.
    #[must_use]
    pub fn plan(&self) -> &ListingPlan {
        &self.plan
    }

    /// Compiled path matcher.
    #[must_use]
    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    /// Record format.
    #[must_use]
    pub fn format(&self) -> Format {
        self.format
    }

    /// Storage layout.
    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Forward resolution for this kind.
    #[must_use]
    pub fn resolver(&self) -> AddressResolver<'_> {
        AddressResolver::new(self)
    }

    /// Whether `other` describes the same kind: same name, template,
    /// properties, format and layout.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.name == other.name
            && self.template.source() == other.template.source()
            && self.properties == other.properties
            && self.format == other.format
            && self.layout == other.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PropertyKind;

    #[test]
    fn rejects_bad_template_at_construction() {
        let err = EntityKindDescriptor::new(
            "foo",
            "/foo/{name}",
            vec![PropertyDecl::new("name", PropertyKind::Text)],
            Format::Json,
            Layout::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::UnsupportedPropertyType { .. }));
    }

    #[test]
    fn derives_everything_eagerly() {
        let d = EntityKindDescriptor::new(
            "subwidget",
            "/widgets/{widgetId}/subwidgets/{id}",
            vec![PropertyDecl::uuid("widgetId"), PropertyDecl::uuid("id")],
            Format::Cbor,
            Layout::VersionDirectory,
        )
        .unwrap();
        assert_eq!(d.listing_template().source(), "/widgets/{widgetId}/subwidgets/");
        assert_eq!(d.plan().static_prefix(), "/widgets/");
        assert!(d.matcher().as_str().ends_with(r"\.cbor$"));
        assert_eq!(d.layout().name(), "version_directory");
    }

    #[test]
    fn layout_schema_form() {
        let layout: Layout = serde_json::from_str(r#"{"type":"document","history":true}"#).unwrap();
        assert_eq!(layout, Layout::Document { history: true });
        let layout: Layout = serde_json::from_str(r#"{"type":"document"}"#).unwrap();
        assert_eq!(layout, Layout::default());
        let layout: Layout = serde_json::from_str(r#"{"type":"version_directory"}"#).unwrap();
        assert_eq!(layout, Layout::VersionDirectory);
    }
}
