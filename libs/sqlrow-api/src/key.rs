use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RowError;

/// Address of a result column for keyed access.
///
/// - `Name`: the label the column carries in the result set (`"user_id"`).
/// - `Column`: a table-qualified column reference (`users.id`). `table = None`
///   behaves as an unqualified column object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Name(String),
    Column { table: Option<String>, name: String },
}

impl Key {
    pub fn column(table: impl Into<String>, name: impl Into<String>) -> Self {
        Key::Column {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    /// Bare column name, without any table qualifier.
    pub fn name(&self) -> &str {
        match self {
            Key::Name(name) => name,
            Key::Column { name, .. } => name,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Column {
                table: Some(table),
                name,
            } => write!(f, "{table}.{name}"),
            Key::Column { table: None, name } => f.write_str(name),
        }
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Name(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Name(v)
    }
}

/// Lookup record for a key.
///
/// `index = None` marks an ambiguous key: it matches two or more columns and
/// cannot be used for keyed access. `context` is free text describing the
/// ambiguity; rows only ever put it into error messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub index: Option<usize>,
    pub key: Key,
    #[serde(default)]
    pub context: Option<String>,
}

impl KeyRecord {
    pub fn unique(index: usize, key: Key) -> Self {
        Self {
            index: Some(index),
            key,
            context: None,
        }
    }

    pub fn ambiguous(key: Key, context: impl Into<String>) -> Self {
        Self {
            index: None,
            key,
            context: Some(context.into()),
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        self.index.is_none()
    }
}

/// Per-result-set key table. Shared by every row of the result set.
///
/// Serialized as a list of `(key, record)` entries so that formats without
/// structured map keys (JSON) can carry it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<(Key, KeyRecord)>", into = "Vec<(Key, KeyRecord)>")]
pub struct KeyMap {
    entries: HashMap<Key, KeyRecord>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Insert or replace the record for `key`. Returns the previous record.
    pub fn insert(&mut self, key: Key, record: KeyRecord) -> Option<KeyRecord> {
        self.entries.insert(key, record)
    }

    /// Primary lookup. `None` means the key is unknown to this table and the
    /// caller should try the metadata fallback.
    #[inline]
    pub fn get(&self, key: &Key) -> Option<&KeyRecord> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &KeyRecord)> {
        self.entries.iter()
    }

    /// Highest column index referenced by any record.
    pub fn max_index(&self) -> Option<usize> {
        self.entries.values().filter_map(|r| r.index).max()
    }
}

impl FromIterator<(Key, KeyRecord)> for KeyMap {
    fn from_iter<I: IntoIterator<Item = (Key, KeyRecord)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<(Key, KeyRecord)>> for KeyMap {
    fn from(entries: Vec<(Key, KeyRecord)>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<KeyMap> for Vec<(Key, KeyRecord)> {
    fn from(map: KeyMap) -> Self {
        let mut entries: Vec<_> = map.entries.into_iter().collect();
        entries.sort_by_key(|(_, record)| record.index);
        entries
    }
}

/// Render diagnostic text as ASCII.
///
/// Ambiguous-key messages only support ASCII text. Anything else fails with
/// [`RowError::Encoding`] carrying an escaped form of the input.
pub fn render_ascii(text: &str) -> Result<&str, RowError> {
    if text.is_ascii() {
        Ok(text)
    } else {
        Err(RowError::Encoding {
            escaped: text.escape_default().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keymap() -> KeyMap {
        let mut map = KeyMap::new();
        map.insert(Key::from("x"), KeyRecord::unique(0, Key::from("x")));
        map.insert(
            Key::column("t", "x"),
            KeyRecord::unique(0, Key::column("t", "x")),
        );
        map.insert(
            Key::from("y"),
            KeyRecord::ambiguous(Key::from("y"), "ambiguous column y"),
        );
        map
    }

    #[test]
    fn lookup_distinguishes_unique_and_ambiguous() {
        let map = keymap();
        let x = map.get(&Key::from("x")).unwrap();
        assert_eq!(x.index, Some(0));
        assert!(!x.is_ambiguous());

        let y = map.get(&Key::from("y")).unwrap();
        assert!(y.is_ambiguous());
        assert_eq!(y.context.as_deref(), Some("ambiguous column y"));

        assert!(map.get(&Key::from("z")).is_none());
        assert_eq!(map.max_index(), Some(0));
    }

    #[test]
    fn qualified_and_bare_keys_are_distinct() {
        let map = keymap();
        assert_ne!(Key::column("t", "x"), Key::from("x"));
        assert!(map.contains_key(&Key::column("t", "x")));
        assert!(!map.contains_key(&Key::column("u", "x")));
        assert_eq!(Key::column("t", "x").to_string(), "t.x");
        assert_eq!(Key::column("t", "x").name(), "x");
    }

    #[test]
    fn keymap_survives_json() {
        let map = keymap();
        let json = serde_json::to_string(&map).unwrap();
        let back: KeyMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn render_ascii_rejects_non_ascii() {
        assert_eq!(render_ascii("plain").unwrap(), "plain");
        let err = render_ascii("naïve").unwrap_err();
        assert!(matches!(err, RowError::Encoding { ref escaped } if escaped == "na\\u{ef}ve"));
    }
}
