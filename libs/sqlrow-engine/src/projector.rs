use std::fmt;

use serde::{Deserialize, Serialize};

use sqlrow_api::{Key, ResultMetadata, RowError, Value};

use crate::row::Row;

/// Reusable extractor for an ordered subset of keyed row values.
///
/// Built once per grouping/sorting pass and applied to every row, so
/// `apply` allocates nothing but its output.
///
/// Serializes as its key list; deserializing calls [`KeyProjector::new`] again.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Key>", into = "Vec<Key>")]
pub struct KeyProjector {
    keys: Box<[Key]>,
}

impl KeyProjector {
    pub fn new<I, K>(keys: I) -> Result<Self, RowError>
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        let keys: Box<[Key]> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Err(RowError::EmptyProjection);
        }
        Ok(Self { keys })
    }

    pub fn arity(&self) -> usize {
        self.keys.len()
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Borrow the projected values from `row`, in key order.
    ///
    /// The first key that fails aborts the projection; no partial tuple is
    /// ever returned.
    pub fn apply<'r, M: ResultMetadata>(&self, row: &'r Row<M>) -> Result<Vec<&'r Value>, RowError> {
        let mut projected = Vec::with_capacity(self.keys.len());
        for key in self.keys.iter() {
            projected.push(row.get_by_key(key)?);
        }
        Ok(projected)
    }

    /// Like [`KeyProjector::apply`], cloning the values out of the row.
    pub fn apply_owned<M: ResultMetadata>(&self, row: &Row<M>) -> Result<Vec<Value>, RowError> {
        let mut projected = Vec::with_capacity(self.keys.len());
        for key in self.keys.iter() {
            projected.push(row.get_by_key(key)?.clone());
        }
        Ok(projected)
    }
}

impl TryFrom<Vec<Key>> for KeyProjector {
    type Error = RowError;

    fn try_from(keys: Vec<Key>) -> Result<Self, Self::Error> {
        KeyProjector::new(keys)
    }
}

impl From<KeyProjector> for Vec<Key> {
    fn from(projector: KeyProjector) -> Self {
        projector.keys.into_vec()
    }
}

impl fmt::Display for KeyProjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let single = self.keys.len() == 1;
        f.write_str(if single { "KeyProjector((" } else { "KeyProjector(" })?;
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{key}'")?;
        }
        f.write_str(if single { ",))" } else { ")" })
    }
}

impl fmt::Debug for KeyProjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
