use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sqlrow_api::{Key, KeyMap, KeyRecord, ResultMetadata, RowError};

/// One column of a result set, as described by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    /// Source table, when the driver reports one.
    #[serde(default)]
    pub table: Option<String>,
}

impl ColumnDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: Some(table.into()),
        }
    }
}

/// Result-set metadata built from column descriptions.
///
/// The keymap lists every column name and every `table.name` pair. Names
/// shared by several columns are ambiguous. Fallback covers what the keymap
/// does not list:
/// - with `case_sensitive = false`, names and `table.name` pairs match
///   ignoring case;
/// - `Column` keys that still miss resolve through the bare name, unless the
///   matched column belongs to another table.
///
/// Serializes as its column descriptions; the keymap is rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "MetadataState", into = "MetadataState")]
pub struct ColumnMetadata {
    columns: Vec<ColumnDescription>,
    case_sensitive: bool,
    keymap: Arc<KeyMap>,
    folded: HashMap<Key, KeyRecord>,
}

#[derive(Serialize, Deserialize)]
struct MetadataState {
    columns: Vec<ColumnDescription>,
    #[serde(default = "default_case_sensitive")]
    case_sensitive: bool,
}

fn default_case_sensitive() -> bool {
    true
}

impl From<MetadataState> for ColumnMetadata {
    fn from(state: MetadataState) -> Self {
        ColumnMetadata::new(state.columns, state.case_sensitive)
    }
}

impl From<ColumnMetadata> for MetadataState {
    fn from(metadata: ColumnMetadata) -> Self {
        MetadataState {
            columns: metadata.columns,
            case_sensitive: metadata.case_sensitive,
        }
    }
}

impl ColumnMetadata {
    pub fn new(columns: Vec<ColumnDescription>, case_sensitive: bool) -> Self {
        let keymap = build_keymap(&columns);
        let folded = if case_sensitive {
            HashMap::new()
        } else {
            build_folded(&columns)
        };
        tracing::debug!(
            columns = columns.len(),
            keys = keymap.len(),
            case_sensitive,
            "built result keymap"
        );
        Self {
            columns,
            case_sensitive,
            keymap: Arc::new(keymap),
            folded,
        }
    }

    /// Shared keymap handle, to be given to every row of the result set.
    pub fn keymap(&self) -> &Arc<KeyMap> {
        &self.keymap
    }

    pub fn columns(&self) -> &[ColumnDescription] {
        &self.columns
    }

    /// Column names in result order.
    pub fn keys(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Exact keymap match, then the case-folded table when enabled.
    fn lookup(&self, key: &Key) -> Option<KeyRecord> {
        if let Some(record) = self.keymap.get(key) {
            return Some(record.clone());
        }
        if self.case_sensitive {
            return None;
        }
        self.folded.get(&fold_key(key)).cloned()
    }

    /// A qualified key must not resolve to a column of a different table.
    fn table_matches(&self, record: &KeyRecord, table: Option<&str>) -> bool {
        let (Some(index), Some(table)) = (record.index, table) else {
            return true;
        };
        match self.columns.get(index).and_then(|c| c.table.as_deref()) {
            Some(actual) if self.case_sensitive => actual == table,
            Some(actual) => fold(actual) == fold(table),
            None => true,
        }
    }
}

impl ResultMetadata for ColumnMetadata {
    fn key_fallback(&self, key: &Key) -> Result<KeyRecord, RowError> {
        let record = match key {
            Key::Name(_) => self.lookup(key),
            Key::Column { table, name } => {
                let qualified = match table {
                    Some(_) => self.lookup(key),
                    None => None,
                };
                qualified.or_else(|| {
                    self.lookup(&Key::Name(name.clone()))
                        .filter(|record| self.table_matches(record, table.as_deref()))
                })
            }
        };

        match record {
            Some(record) => {
                tracing::trace!(key = %key, canonical = %record.key, "resolved key through fallback");
                Ok(record)
            }
            None => Err(RowError::KeyNotFound(key.clone())),
        }
    }
}

/// The single case-folding rule for column and table names.
fn fold(text: &str) -> String {
    text.to_lowercase()
}

fn fold_key(key: &Key) -> Key {
    match key {
        Key::Name(name) => Key::Name(fold(name)),
        Key::Column { table, name } => Key::Column {
            table: table.as_deref().map(fold),
            name: fold(name),
        },
    }
}

/// Every key a column answers to: its name and, with a table, `table.name`.
fn column_keys(column: &ColumnDescription) -> impl Iterator<Item = Key> {
    let qualified = column
        .table
        .as_ref()
        .map(|table| Key::column(table.clone(), column.name.clone()));
    std::iter::once(Key::Name(column.name.clone())).chain(qualified)
}

/// Group column positions by key, in first-seen order.
///
/// With `folded`, keys are grouped by their case-folded form and the record
/// keeps the spelling seen first.
fn build_records(columns: &[ColumnDescription], folded: bool) -> Vec<(Key, KeyRecord)> {
    let mut positions: Vec<(Key, Key, Vec<usize>)> = Vec::new();
    let mut slots: HashMap<Key, usize> = HashMap::new();

    for (index, column) in columns.iter().enumerate() {
        for key in column_keys(column) {
            let group = if folded { fold_key(&key) } else { key.clone() };
            match slots.get(&group) {
                Some(&slot) => positions[slot].2.push(index),
                None => {
                    slots.insert(group.clone(), positions.len());
                    positions.push((group, key, vec![index]));
                }
            }
        }
    }

    positions
        .into_iter()
        .map(|(group, key, indices)| (group, record_for(key, &indices)))
        .collect()
}

fn build_keymap(columns: &[ColumnDescription]) -> KeyMap {
    build_records(columns, false).into_iter().collect()
}

fn build_folded(columns: &[ColumnDescription]) -> HashMap<Key, KeyRecord> {
    build_records(columns, true).into_iter().collect()
}

fn record_for(key: Key, indices: &[usize]) -> KeyRecord {
    match indices {
        [index] => KeyRecord::unique(*index, key),
        _ => {
            tracing::debug!(key = %key, ?indices, "column key is ambiguous");
            let listed: Vec<String> = indices.iter().map(usize::to_string).collect();
            KeyRecord::ambiguous(key, format!("matches result columns {}", listed.join(", ")))
        }
    }
}
