use std::sync::Arc;

use sqlrow_api::{Key, KeyMap, ProcessorRef, ResultMetadata, RowError, Value};

use crate::config::ResultSetConfig;
use crate::error::EngineError;
use crate::metadata::ColumnMetadata;
use crate::projector::KeyProjector;
use crate::row::{Row, ambiguous_key};

/// Factory for the rows of one result set.
///
/// Holds the pieces every row shares: metadata, keymap and the per-column
/// processors.
#[derive(Clone)]
pub struct ResultSet {
    metadata: Arc<ColumnMetadata>,
    keymap: Arc<KeyMap>,
    processors: Vec<Option<ProcessorRef>>,
}

impl ResultSet {
    pub fn new(
        metadata: ColumnMetadata,
        processors: Vec<Option<ProcessorRef>>,
    ) -> Result<Self, EngineError> {
        if processors.len() != metadata.len() {
            return Err(EngineError::Config(format!(
                "{} processors configured for {} columns",
                processors.len(),
                metadata.len()
            )));
        }
        let keymap = Arc::clone(metadata.keymap());
        tracing::debug!(
            columns = metadata.len(),
            processors = processors.iter().filter(|p| p.is_some()).count(),
            "result set ready"
        );
        Ok(Self {
            metadata: Arc::new(metadata),
            keymap,
            processors,
        })
    }

    /// Result set whose rows keep driver values as they are.
    pub fn without_processors(metadata: ColumnMetadata) -> Self {
        let processors = vec![None; metadata.len()];
        let keymap = Arc::clone(metadata.keymap());
        Self {
            metadata: Arc::new(metadata),
            keymap,
            processors,
        }
    }

    pub fn from_config(config: &ResultSetConfig) -> Result<Self, EngineError> {
        let metadata = ColumnMetadata::new(config.descriptions(), config.case_sensitive);
        Self::new(metadata, config.processors())
    }

    pub fn metadata(&self) -> &Arc<ColumnMetadata> {
        &self.metadata
    }

    pub fn keymap(&self) -> &Arc<KeyMap> {
        &self.keymap
    }

    pub fn row(&self, raw: Vec<Value>) -> Result<Row<ColumnMetadata>, RowError> {
        Row::new(
            Arc::clone(&self.metadata),
            &self.processors,
            Arc::clone(&self.keymap),
            raw,
        )
    }

    /// Lazily build one row per raw record.
    pub fn rows<'a, I>(
        &'a self,
        raw: I,
    ) -> impl Iterator<Item = Result<Row<ColumnMetadata>, RowError>> + 'a
    where
        I: IntoIterator<Item = Vec<Value>>,
        I::IntoIter: 'a,
    {
        raw.into_iter().map(move |values| self.row(values))
    }

    /// Build a row from a JSON record.
    ///
    /// Arrays are taken positionally. Objects are read by column name; a
    /// column missing from the object is `NULL`.
    pub fn row_from_json(&self, record: serde_json::Value) -> Result<Row<ColumnMetadata>, EngineError> {
        let raw = match record {
            serde_json::Value::Array(items) => items.into_iter().map(Value::from).collect(),
            serde_json::Value::Object(mut fields) => self
                .metadata
                .columns()
                .iter()
                .map(|column| fields.remove(&column.name).map(Value::from).unwrap_or(Value::Null))
                .collect(),
            other => {
                return Err(EngineError::Config(format!(
                    "record must be an array or an object, got {other}"
                )));
            }
        };
        Ok(self.row(raw)?)
    }

    /// Build a projector, checking up front that every key resolves to
    /// exactly one column of this result set.
    pub fn projector<I, K>(&self, keys: I) -> Result<KeyProjector, RowError>
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        let projector = KeyProjector::new(keys)?;
        for key in projector.keys() {
            let record = match self.keymap.get(key) {
                Some(record) => record.clone(),
                None => self.metadata.key_fallback(key)?,
            };
            if record.index.is_none() {
                return Err(ambiguous_key(key, &record));
            }
        }
        Ok(projector)
    }
}
