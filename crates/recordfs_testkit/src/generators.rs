//! Property-based test generators using proptest.
//!
//! Provides strategies for identifiers, keys and sample records, plus file
//! names that must never be mistaken for records.

use crate::fixtures::{Note, Subwidget, Widget};
use proptest::prelude::*;
use recordfs_core::Key;
use uuid::Uuid;

/// Strategy for generating UUIDs, including all-zero and all-one patterns.
pub fn uuid_strategy() -> impl Strategy<Value = Uuid> {
    prop_oneof![
        1 => Just(Uuid::nil()),
        1 => Just(Uuid::from_u128(u128::MAX)),
        8 => any::<u128>().prop_map(Uuid::from_u128),
    ]
}

/// Strategy for generating keys with exactly the given property names.
pub fn key_strategy(names: &'static [&'static str]) -> impl Strategy<Value = Key> {
    prop::collection::vec(uuid_strategy(), names.len())
        .prop_map(move |values| names.iter().copied().zip(values).collect())
}

/// Strategy for generating widgets.
pub fn widget_strategy() -> impl Strategy<Value = Widget> {
    (uuid_strategy(), "[a-z ]{0,16}").prop_map(|(id, name)| Widget::new(id, name))
}

/// Strategy for generating subwidgets.
pub fn subwidget_strategy() -> impl Strategy<Value = Subwidget> {
    (uuid_strategy(), uuid_strategy(), "[a-z ]{0,16}")
        .prop_map(|(widget_id, id, name)| Subwidget::new(widget_id, id, name))
}

/// Strategy for generating notes.
pub fn note_strategy() -> impl Strategy<Value = Note> {
    (uuid_strategy(), uuid_strategy(), ".{0,32}")
        .prop_map(|(widget_id, id, text)| Note::new(widget_id, id, text))
}

/// Strategy for generating file names that are not `<uuid>.json`.
///
/// Covers sync-tool and editor droppings around a real identifier, wrong
/// suffixes, broken identifiers and arbitrary text.
pub fn noise_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        uuid_strategy().prop_map(|id| format!(".syncthing.{id}.json.tmp")),
        uuid_strategy().prop_map(|id| format!(".{id}.json.swp")),
        uuid_strategy().prop_map(|id| format!("{id}.json~")),
        uuid_strategy().prop_map(|id| format!("{id}.cbor")),
        uuid_strategy().prop_map(|id| id.to_string()),
        uuid_strategy().prop_map(|id| format!("{}.json", id.simple())),
        (uuid_strategy(), 0usize..36).prop_map(|(id, at)| {
            let mut text: Vec<char> = id.to_string().chars().collect();
            text[at] = if text[at] == '-' { 'a' } else { 'z' };
            format!("{}.json", text.into_iter().collect::<String>())
        }),
        "[a-zA-Z0-9_.~-]{1,24}".prop_filter("must not be a uuid file", |s| !s.ends_with(".json")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn keys_have_requested_names(key in key_strategy(&["widgetId", "id"])) {
            prop_assert_eq!(key.names().collect::<Vec<_>>(), vec!["widgetId", "id"]);
        }

        #[test]
        fn noise_names_are_not_uuid_files(name in noise_name_strategy()) {
            let stem = name.strip_suffix(".json");
            let parses = stem.is_some_and(|s| s.len() == 36 && Uuid::parse_str(s).is_ok());
            prop_assert!(!parses, "{}", name);
        }
    }
}
