//! Rebuilding rows from serialized state.
//!
//! A row serializes to exactly three named fields: `parent` (the result-set
//! metadata), `row` (the processed values) and `keymap`. Deserialization never
//! runs processors again: it fills a [`RowSlots`] through the target type's
//! [`Reconstruct::set_state`], validates that all three fields are present and
//! only then hands out a row.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use sqlrow_api::{KeyMap, RowError, Value};

use crate::row::Row;

/// Serialized form of a row.
///
/// Every field is optional on the wire so that incomplete state reaches
/// validation and fails with [`RowError::Reconstruction`] instead of a
/// format-specific error.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(serialize = "M: Serialize", deserialize = "M: Deserialize<'de>"))]
pub struct RowState<M> {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub parent: Option<Arc<M>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub row: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub keymap: Option<Arc<KeyMap>>,
}

/// A field that is on the wire is set, even if its value serializes as `null`
/// (unit metadata does). Only an absent field stays `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// A row under reconstruction. Never observable as a [`Row`] until
/// [`RowSlots::into_row`] has checked every field.
#[derive(Debug)]
pub struct RowSlots<M> {
    pub parent: Option<Arc<M>>,
    pub row: Option<Box<[Value]>>,
    pub keymap: Option<Arc<KeyMap>>,
}

impl<M> Default for RowSlots<M> {
    fn default() -> Self {
        Self {
            parent: None,
            row: None,
            keymap: None,
        }
    }
}

impl<M> RowSlots<M> {
    /// Validate and seal. Fails naming the first missing field, or when the
    /// keymap points past the end of the values.
    pub fn into_row(self) -> Result<Row<M>, RowError> {
        let parent = self.parent.ok_or(RowError::Reconstruction { field: "parent" })?;
        let values = self.row.ok_or(RowError::Reconstruction { field: "row" })?;
        let keymap = self.keymap.ok_or(RowError::Reconstruction { field: "keymap" })?;
        if let Some(index) = keymap.max_index().filter(|&i| i >= values.len()) {
            return Err(RowError::KeymapOutOfRange {
                index,
                len: values.len(),
            });
        }
        Ok(Row::from_parts(parent, values, keymap))
    }
}

/// Types that can be rebuilt from [`RowState`].
///
/// `set_state` is the restore step the type defines for itself; the default
/// copies the three fields verbatim. Wrappers around [`Row`] may override it to
/// migrate or derive fields, but must leave all three set.
pub trait Reconstruct: Sized {
    type Metadata;

    fn set_state(
        slots: &mut RowSlots<Self::Metadata>,
        state: RowState<Self::Metadata>,
    ) -> Result<(), RowError> {
        slots.parent = state.parent;
        slots.row = state.row.map(Vec::into_boxed_slice);
        slots.keymap = state.keymap;
        Ok(())
    }

    fn from_row(row: Row<Self::Metadata>) -> Self;
}

impl<M> Reconstruct for Row<M> {
    type Metadata = M;

    fn from_row(row: Row<M>) -> Self {
        row
    }
}

/// Rebuild a `T` from saved state, bypassing normal row construction.
pub fn reconstruct<T: Reconstruct>(state: RowState<T::Metadata>) -> Result<T, RowError> {
    let mut slots = RowSlots::default();
    T::set_state(&mut slots, state)?;
    match slots.into_row() {
        Ok(row) => Ok(T::from_row(row)),
        Err(e) => {
            tracing::debug!(error = %e, "rejecting incomplete row state");
            Err(e)
        }
    }
}

#[derive(Serialize)]
struct RowStateRef<'a, M> {
    parent: &'a Arc<M>,
    row: &'a [Value],
    keymap: &'a Arc<KeyMap>,
}

impl<M: Serialize> Serialize for Row<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RowStateRef {
            parent: self.parent(),
            row: self.as_slice(),
            keymap: self.keymap(),
        }
        .serialize(serializer)
    }
}

impl<'de, M: Deserialize<'de>> Deserialize<'de> for Row<M> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let state = RowState::<M>::deserialize(deserializer)?;
        reconstruct(state).map_err(serde::de::Error::custom)
    }
}
