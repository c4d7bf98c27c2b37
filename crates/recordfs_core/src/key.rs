//! Record keys and addresses.

use crate::descriptor::EntityKindDescriptor;
use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// The identifier values that address one record of an entity kind.
///
/// Entries keep the order they were inserted in; keys decoded from paths are
/// always in template order. Equality compares entries by name and ignores
/// order, so a hand-built key equals the decoded one.
///
/// # Example
///
/// ```rust
/// use recordfs_core::Key;
/// use uuid::Uuid;
///
/// let widget = Uuid::new_v4();
/// let id = Uuid::new_v4();
/// let a = Key::new().with("widgetId", widget).with("id", id);
/// let b = Key::new().with("id", id).with("widgetId", widget);
/// assert_eq!(a, b);
/// assert_eq!(a.get("id"), Some(id));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Key {
    entries: Vec<(String, Uuid)>,
}

impl Key {
    /// Creates an empty key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns this key with `name` set to `value`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Uuid) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets `name` to `value`, keeping the position of an existing entry.
    pub fn insert(&mut self, name: impl Into<String>, value: Uuid) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Value of `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Uuid> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    /// Property names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Uuid)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the key has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The sub-key holding only `names`, in the order given.
    ///
    /// Names this key lacks are skipped.
    #[must_use]
    pub fn restrict<S: AsRef<str>>(&self, names: &[S]) -> Self {
        names
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                self.get(name).map(|v| (name.to_string(), v))
            })
            .collect()
    }

    fn sorted(&self) -> Vec<(&str, Uuid)> {
        let mut sorted: Vec<_> = self.iter().collect();
        sorted.sort_unstable();
        sorted
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(n, v)| other.get(n) == Some(v))
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sorted().hash(state);
    }
}

impl<S: Into<String>> FromIterator<(S, Uuid)> for Key {
    fn from_iter<I: IntoIterator<Item = (S, Uuid)>>(iter: I) -> Self {
        let mut key = Self::new();
        for (name, value) in iter {
            key.insert(name, value);
        }
        key
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str("}")
    }
}

/// A resolved root-relative path, e.g. `/widgets/<uuid>.json`.
///
/// Addresses are computed on demand and never persisted. Listing prefixes and
/// version containers end with `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordAddress(String);

impl RecordAddress {
    /// Wraps a path string.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The path text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the address, returning the path text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Whether the address names a directory rather than a file.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.0.ends_with('/')
    }
}

impl fmt::Display for RecordAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<RecordAddress> for String {
    fn from(address: RecordAddress) -> Self {
        address.0
    }
}

/// Turns raw path captures into typed keys.
pub struct KeyCodec;

impl KeyCodec {
    /// Builds a key from captures in template order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if the capture count differs from the template's
    /// variable count or a capture is not a UUID.
    pub fn decode<S: AsRef<str>>(descriptor: &EntityKindDescriptor, captures: &[S]) -> CoreResult<Key> {
        let variables = descriptor.template().variables();
        if captures.len() != variables.len() {
            return Err(CoreError::invalid_key(
                descriptor.name(),
                format!("expected {} captures, got {}", variables.len(), captures.len()),
            ));
        }
        variables
            .iter()
            .zip(captures)
            .map(|(name, raw)| {
                let raw = raw.as_ref();
                Uuid::parse_str(raw)
                    .map(|value| (name.clone(), value))
                    .map_err(|e| CoreError::invalid_key(descriptor.name(), format!("{name}={raw}: {e}")))
            })
            .collect()
    }

    /// Key of a record path, or `None` if the path is not a record of this
    /// kind.
    #[must_use]
    pub fn key_of_path(descriptor: &EntityKindDescriptor, path: &str) -> Option<Key> {
        let captures = descriptor.matcher().captures(path)?;
        Self::decode(descriptor, &captures).ok()
    }

    /// Key of a version container path, or `None` if the path is not one.
    #[must_use]
    pub fn key_of_container(descriptor: &EntityKindDescriptor, path: &str) -> Option<Key> {
        let captures = descriptor.matcher().container_captures(path)?;
        Self::decode(descriptor, &captures).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Layout;
    use crate::schema::PropertyDecl;
    use proptest::prelude::*;
    use recordfs_codec::Format;
    use std::collections::HashSet;

    fn subwidgets() -> EntityKindDescriptor {
        EntityKindDescriptor::new(
            "subwidget",
            "/widgets/{widgetId}/subwidgets/{id}",
            vec![PropertyDecl::uuid("widgetId"), PropertyDecl::uuid("id")],
            Format::Json,
            Layout::default(),
        )
        .unwrap()
    }

    #[test]
    fn equality_ignores_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let k1 = Key::new().with("x", a).with("y", b);
        let k2 = Key::new().with("y", b).with("x", a);
        assert_eq!(k1, k2);

        let mut set = HashSet::new();
        set.insert(k1);
        assert!(set.contains(&k2));

        assert_ne!(Key::new().with("x", a), Key::new().with("x", b));
        assert_ne!(Key::new().with("x", a), Key::new().with("x", a).with("y", b));
    }

    #[test]
    fn insert_replaces_in_place() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let key = Key::new().with("x", a).with("y", a).with("x", b);
        assert_eq!(key.names().collect::<Vec<_>>(), ["x", "y"]);
        assert_eq!(key.get("x"), Some(b));
    }

    #[test]
    fn restrict_keeps_requested_names() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let key = Key::new().with("widgetId", a).with("id", b);
        let parent = key.restrict(&["widgetId"]);
        assert_eq!(parent, Key::new().with("widgetId", a));
        assert!(key.restrict::<&str>(&[]).is_empty());
    }

    #[test]
    fn display_lists_entries() {
        let id = Uuid::parse_str("1f30d7b6-0296-489a-9615-55868aeef78a").unwrap();
        assert_eq!(
            Key::new().with("id", id).to_string(),
            "{id=1f30d7b6-0296-489a-9615-55868aeef78a}"
        );
    }

    #[test]
    fn decode_in_template_order() {
        let d = subwidgets();
        let key = KeyCodec::decode(
            &d,
            &["1f30d7b6-0296-489a-9615-55868aeef78a", "220460be-27d4-4e6d-8ac3-34cf5139b229"],
        )
        .unwrap();
        assert_eq!(key.names().collect::<Vec<_>>(), ["widgetId", "id"]);
        assert_eq!(
            key.get("id"),
            Some(Uuid::parse_str("220460be-27d4-4e6d-8ac3-34cf5139b229").unwrap())
        );
    }

    #[test]
    fn decode_rejects_bad_captures() {
        let d = subwidgets();
        let err = KeyCodec::decode(&d, &["1f30d7b6-0296-489a-9615-55868aeef78a"]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidKey { .. }));

        let err = KeyCodec::decode(&d, &["nope", "220460be-27d4-4e6d-8ac3-34cf5139b229"]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidKey { .. }));
    }

    #[test]
    fn key_of_path_ignores_noise() {
        let d = subwidgets();
        assert!(KeyCodec::key_of_path(&d, "/widgets/x/subwidgets/y.json").is_none());
        let key = KeyCodec::key_of_path(
            &d,
            "/widgets/1f30d7b6-0296-489a-9615-55868aeef78a/subwidgets/220460be-27d4-4e6d-8ac3-34cf5139b229.json",
        )
        .unwrap();
        assert_eq!(key.len(), 2);
    }

    proptest! {
        #[test]
        fn resolve_then_decode_roundtrips(w in any::<u128>(), i in any::<u128>()) {
            let d = subwidgets();
            let key = Key::new()
                .with("id", Uuid::from_u128(i))
                .with("widgetId", Uuid::from_u128(w));
            let address = d.resolver().resolve(&key).unwrap();
            let captures = d.matcher().extract_captures(address.as_str());
            let decoded = KeyCodec::decode(&d, &captures).unwrap();
            prop_assert_eq!(decoded, key);
        }
    }
}
