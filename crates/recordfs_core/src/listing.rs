//! Bounded traversal plans for enumerating an entity kind.

use crate::descriptor::Layout;
use crate::schema::{PathTemplate, Segment};

/// Where to start and how deep to walk to find every instance of a kind.
///
/// `static_prefix` is the directory formed by the literal run before the
/// first variable, cut back to its last `/`; `depth` counts the separators
/// that follow it. A walk from the prefix never needs to descend further than
/// the plan allows, and never enters directories of unrelated kinds beside
/// it.
///
/// | template | prefix | depth |
/// |---|---|---|
/// | `/widgets/{id}` | `/widgets/` | 0 |
/// | `/widgets/{widgetId}/subwidgets/{id}` | `/widgets/` | 2 |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPlan {
    static_prefix: String,
    depth: usize,
}

impl ListingPlan {
    /// Computes the plan for `template`.
    #[must_use]
    pub fn for_template(template: &PathTemplate) -> Self {
        let mut leading = String::new();
        for segment in template.segments() {
            match segment {
                Segment::Literal(text) => leading.push_str(text),
                Segment::DirectorySeparator => leading.push('/'),
                Segment::Variable { .. } => break,
            }
        }
        let cut = leading.rfind('/').map_or(0, |idx| idx + 1);
        leading.truncate(cut);
        if leading.is_empty() {
            leading.push('/');
        }

        let depth = template.source()[leading.len()..].matches('/').count();
        Self {
            static_prefix: leading,
            depth,
        }
    }

    /// Directory to start walking from, ending with `/`.
    #[must_use]
    pub fn static_prefix(&self) -> &str {
        &self.static_prefix
    }

    /// Separators after the static prefix.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Walk depth at which record files of `layout` live.
    #[must_use]
    pub const fn record_depth(&self, layout: Layout) -> usize {
        match layout {
            Layout::Document { .. } => self.depth + 1,
            Layout::VersionDirectory => self.depth + 2,
        }
    }

    /// Walk depth at which version containers live.
    #[must_use]
    pub const fn container_depth(&self) -> usize {
        self.depth + 1
    }
}
