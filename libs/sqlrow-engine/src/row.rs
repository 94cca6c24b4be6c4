use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};
use std::sync::Arc;

use sqlrow_api::key::render_ascii;
use sqlrow_api::{Key, KeyMap, KeyRecord, ProcessorRef, ResultMetadata, RowError, Value};

use crate::reconstruct::RowState;

/// One fetched record: processed values with positional and keyed addressing.
///
/// The value tuple is owned by the row and fixed at construction. Metadata
/// and keymap are shared by every row of the result set.
///
/// Equality and hashing look at the values only, so rows produced by
/// different result sets (or different metadata types) compare equal when
/// their values do.
pub struct Row<M> {
    parent: Arc<M>,
    values: Box<[Value]>,
    keymap: Arc<KeyMap>,
}

impl<M> Row<M> {
    /// Build a row from raw driver values.
    ///
    /// `processors[i]` is applied to `raw[i]`; `None` keeps the raw value.
    /// The first processor error aborts construction and is returned as is.
    pub fn new(
        parent: Arc<M>,
        processors: &[Option<ProcessorRef>],
        keymap: Arc<KeyMap>,
        raw: Vec<Value>,
    ) -> Result<Self, RowError> {
        if raw.len() != processors.len() {
            return Err(RowError::ArityMismatch {
                values: raw.len(),
                processors: processors.len(),
            });
        }

        let mut values = Vec::with_capacity(raw.len());
        for (value, processor) in raw.into_iter().zip(processors) {
            values.push(match processor {
                Some(processor) => processor.process(value)?,
                None => value,
            });
        }

        Ok(Self::from_parts(parent, values.into_boxed_slice(), keymap))
    }

    pub(crate) fn from_parts(parent: Arc<M>, values: Box<[Value]>, keymap: Arc<KeyMap>) -> Self {
        Self {
            parent,
            values,
            keymap,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Positional access. Negative indices count from the end.
    #[inline]
    pub fn get(&self, index: isize) -> Result<&Value, RowError> {
        let len = self.values.len();
        let normalized = if index < 0 {
            index + len as isize
        } else {
            index
        };
        if normalized < 0 {
            return Err(RowError::IndexOutOfRange { index, len });
        }
        self.values
            .get(normalized as usize)
            .ok_or(RowError::IndexOutOfRange { index, len })
    }

    #[inline]
    fn get_index(&self, index: usize) -> Result<&Value, RowError> {
        self.values.get(index).ok_or(RowError::IndexOutOfRange {
            index: index as isize,
            len: self.values.len(),
        })
    }

    /// Apply a slice to the value tuple. Returns plain values, not a row.
    pub fn slice(&self, slice: impl Into<Slice>) -> Result<Vec<Value>, RowError> {
        let slice = slice.into();
        Ok(slice
            .indices(self.values.len())?
            .map(|i| self.values[i].clone())
            .collect())
    }

    /// Copy of the value tuple.
    pub fn values(&self) -> Vec<Value> {
        self.values.to_vec()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    /// Fresh iterator over the values. Every call starts from the beginning.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn parent(&self) -> &Arc<M> {
        &self.parent
    }

    pub fn keymap(&self) -> &Arc<KeyMap> {
        &self.keymap
    }

    /// Export the state needed to rebuild this row elsewhere.
    pub fn to_state(&self) -> RowState<M> {
        RowState {
            parent: Some(Arc::clone(&self.parent)),
            row: Some(self.values.to_vec()),
            keymap: Some(Arc::clone(&self.keymap)),
        }
    }
}

impl<M: ResultMetadata> Row<M> {
    /// Keyed access.
    ///
    /// Looks the key up in the keymap, then in the metadata fallback. A key
    /// matching several columns fails with [`RowError::AmbiguousKey`].
    #[inline]
    pub fn get_by_key(&self, key: &Key) -> Result<&Value, RowError> {
        let fallback;
        let record = match self.keymap.get(key) {
            Some(record) => record,
            None => {
                fallback = self.parent.key_fallback(key)?;
                &fallback
            }
        };

        match record.index {
            Some(index) => self.get_index(index),
            None => Err(ambiguous_key(key, record)),
        }
    }

    /// Subscript dispatch: integers are positions, slices are slices,
    /// anything else is a key.
    pub fn get_item(&self, index: impl Into<RowIndex>) -> Result<Item<'_>, RowError> {
        match index.into() {
            RowIndex::Position(i) => self.get(i).map(Item::One),
            RowIndex::Slice(s) => self.slice(s).map(Item::Many),
            RowIndex::Key(key) => self.get_by_key(&key).map(Item::One),
        }
    }

    /// Attribute-style access.
    ///
    /// Reserved row fields (`_parent`, `_row`, `_keymap`) win over columns.
    /// Otherwise `name` is looked up as a key; only a plain miss becomes
    /// [`RowError::AttributeNotFound`], ambiguity and other errors pass through.
    pub fn attr(&self, name: &str) -> Result<RowAttr<'_, M>, RowError> {
        match name {
            "_parent" => return Ok(RowAttr::Parent(&self.parent)),
            "_row" => return Ok(RowAttr::Row(&self.values)),
            "_keymap" => return Ok(RowAttr::KeyMap(&self.keymap)),
            _ => {}
        }

        match self.get_by_key(&Key::from(name)) {
            Ok(value) => Ok(RowAttr::Column(value)),
            Err(RowError::KeyNotFound(key)) => Err(RowError::AttributeNotFound(key)),
            Err(e) => Err(e),
        }
    }
}

pub(crate) fn ambiguous_key(key: &Key, record: &KeyRecord) -> RowError {
    let key_text = key.to_string();
    let context = match &record.context {
        Some(context) => context.clone(),
        None => record.key.to_string(),
    };
    if let Err(e) = render_ascii(&key_text).and_then(|_| render_ascii(&context)) {
        return e;
    }
    RowError::AmbiguousKey {
        key: key_text,
        context,
    }
}

impl<M> Clone for Row<M> {
    fn clone(&self) -> Self {
        Self {
            parent: Arc::clone(&self.parent),
            values: self.values.clone(),
            keymap: Arc::clone(&self.keymap),
        }
    }
}

impl<M, N> PartialEq<Row<N>> for Row<M> {
    fn eq(&self, other: &Row<N>) -> bool {
        self.values == other.values
    }
}

impl<M> Eq for Row<M> {}

impl<M> Hash for Row<M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.values.hash(state);
    }
}

impl<M> fmt::Debug for Row<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Row").field(&self.values).finish()
    }
}

impl<M> fmt::Display for Row<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        if self.values.len() == 1 {
            f.write_str(",")?;
        }
        f.write_str(")")
    }
}

impl<'r, M> IntoIterator for &'r Row<M> {
    type Item = &'r Value;
    type IntoIter = std::slice::Iter<'r, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Result of [`Row::attr`].
#[derive(Debug)]
pub enum RowAttr<'r, M> {
    Parent(&'r Arc<M>),
    Row(&'r [Value]),
    KeyMap(&'r Arc<KeyMap>),
    Column(&'r Value),
}

impl<'r, M> RowAttr<'r, M> {
    /// The column value, if this attribute resolved to a column.
    pub fn column(&self) -> Option<&'r Value> {
        match self {
            RowAttr::Column(value) => Some(value),
            _ => None,
        }
    }
}

/// Subscript accepted by [`Row::get_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIndex {
    Position(isize),
    Slice(Slice),
    Key(Key),
}

impl From<isize> for RowIndex {
    fn from(v: isize) -> Self {
        RowIndex::Position(v)
    }
}

impl From<Slice> for RowIndex {
    fn from(v: Slice) -> Self {
        RowIndex::Slice(v)
    }
}

impl From<Key> for RowIndex {
    fn from(v: Key) -> Self {
        RowIndex::Key(v)
    }
}

impl From<&str> for RowIndex {
    fn from(v: &str) -> Self {
        RowIndex::Key(Key::from(v))
    }
}

/// Result of [`Row::get_item`].
#[derive(Debug, PartialEq, Eq)]
pub enum Item<'r> {
    One(&'r Value),
    Many(Vec<Value>),
}

/// Extended slice over a row: `start:stop:step` with negative indices
/// counting from the end and out-of-range bounds clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: isize,
}

impl Slice {
    pub fn new(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        Self { start, stop, step }
    }

    pub fn with_step(self, step: isize) -> Self {
        Self { step, ..self }
    }

    /// Positions selected from a sequence of length `len`, in order.
    pub fn indices(&self, len: usize) -> Result<impl Iterator<Item = usize>, RowError> {
        let step = self.step;
        if step == 0 {
            return Err(RowError::ZeroSliceStep);
        }
        let len = len as isize;

        let (start, stop) = if step > 0 {
            let clamp = |i: isize| {
                if i < 0 {
                    (i + len).max(0)
                } else {
                    i.min(len)
                }
            };
            (
                self.start.map_or(0, clamp),
                self.stop.map_or(len, clamp),
            )
        } else {
            let clamp = |i: isize| {
                if i < 0 {
                    (i + len).max(-1)
                } else {
                    i.min(len - 1)
                }
            };
            (
                self.start.map_or(len - 1, clamp),
                self.stop.map_or(-1, clamp),
            )
        };

        // `None` once stepping past the end would overflow.
        let mut next = Some(start);
        Ok(std::iter::from_fn(move || {
            let current = next?;
            let in_range = if step > 0 { current < stop } else { current > stop };
            if !in_range {
                return None;
            }
            next = current.checked_add(step);
            Some(current as usize)
        }))
    }
}

impl From<Range<isize>> for Slice {
    fn from(r: Range<isize>) -> Self {
        Slice::new(Some(r.start), Some(r.end), 1)
    }
}

impl From<RangeFrom<isize>> for Slice {
    fn from(r: RangeFrom<isize>) -> Self {
        Slice::new(Some(r.start), None, 1)
    }
}

impl From<RangeTo<isize>> for Slice {
    fn from(r: RangeTo<isize>) -> Self {
        Slice::new(None, Some(r.end), 1)
    }
}

impl From<RangeFull> for Slice {
    fn from(_: RangeFull) -> Self {
        Slice::new(None, None, 1)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;

    use sqlrow_api::processor::processor;
    use sqlrow_api::{ErrorKind, NoFallback, ProcessError};

    use super::*;

    /// Fallback that resolves keys case-insensitively against a fixed table.
    struct LowercaseFallback(KeyMap);

    impl ResultMetadata for LowercaseFallback {
        fn key_fallback(&self, key: &Key) -> Result<KeyRecord, RowError> {
            self.0
                .get(&Key::from(key.name().to_lowercase()))
                .cloned()
                .ok_or_else(|| RowError::KeyNotFound(key.clone()))
        }
    }

    fn keymap() -> Arc<KeyMap> {
        let mut map = KeyMap::new();
        map.insert(Key::from("x"), KeyRecord::unique(0, Key::from("x")));
        map.insert(Key::from("z"), KeyRecord::unique(2, Key::from("z")));
        map.insert(
            Key::from("y"),
            KeyRecord::ambiguous(Key::from("y"), "ambiguous column y"),
        );
        Arc::new(map)
    }

    fn row(values: Vec<Value>) -> Row<NoFallback> {
        let processors = vec![None; values.len()];
        Row::new(Arc::new(NoFallback), &processors, keymap(), values).unwrap()
    }

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn uppercase(value: Value) -> Result<Value, ProcessError> {
        match value {
            Value::String(s) => Ok(Value::String(s.to_uppercase())),
            other => Err(ProcessError::invalid_type(other.kind_name())),
        }
    }

    #[test]
    fn processors_apply_per_column() {
        let processors = vec![None, processor(uppercase)];
        let row = Row::new(
            Arc::new(NoFallback),
            &processors,
            keymap(),
            vec![Value::from(1), Value::from("a")],
        )
        .unwrap();
        assert_eq!(row.values(), vec![Value::from(1), Value::from("A")]);
    }

    #[test]
    fn arity_mismatch_reports_both_lengths() {
        let processors = vec![None, None, None];
        let err = Row::new(
            Arc::new(NoFallback),
            &processors,
            keymap(),
            vec![Value::from(1), Value::from(2)],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RowError::ArityMismatch {
                values: 2,
                processors: 3
            }
        ));
    }

    #[test]
    fn processor_failure_aborts_construction_unchanged() {
        let processors = vec![processor(uppercase), processor(uppercase)];
        let err = Row::new(
            Arc::new(NoFallback),
            &processors,
            keymap(),
            vec![Value::from("ok"), Value::from(7)],
        )
        .unwrap_err();
        match err {
            RowError::Process(e) => assert_eq!(e, ProcessError::invalid_type("int64")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn positional_access_with_negative_indices() {
        let row = row(vec![Value::from(10), Value::from(20), Value::from(30)]);
        assert_eq!(row.get(0).unwrap(), &Value::from(10));
        assert_eq!(row.get(-1).unwrap(), &Value::from(30));
        assert_eq!(row.get(-1).unwrap(), row.get(2).unwrap());
        assert_eq!(row.get(-3).unwrap(), &Value::from(10));

        for index in [3, 100, -4, -100] {
            let err = row.get(index).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Index, "index {index}");
        }
    }

    #[test]
    fn empty_row_rejects_every_index() {
        let row = row(vec![]);
        assert!(row.is_empty());
        assert!(row.get(0).is_err());
        assert!(row.get(-1).is_err());
        assert_eq!(row.slice(..).unwrap(), vec![]);
    }

    #[test]
    fn slices_match_sequence_semantics() {
        let values: Vec<Value> = (0..6).map(|i| Value::from(i * 10)).collect();
        let row = row(values.clone());

        assert_eq!(row.slice(1isize..3).unwrap(), values[1..3].to_vec());
        assert_eq!(row.slice(..).unwrap(), values);
        assert_eq!(row.slice(-2isize..).unwrap(), values[4..].to_vec());
        assert_eq!(row.slice(..-4isize).unwrap(), values[..2].to_vec());
        assert_eq!(row.slice(2isize..100).unwrap(), values[2..].to_vec());
        assert_eq!(row.slice(4isize..1).unwrap(), vec![]);

        let every_other = Slice::from(..).with_step(2);
        assert_eq!(
            row.slice(every_other).unwrap(),
            vec![Value::from(0), Value::from(20), Value::from(40)]
        );

        let reversed = Slice::new(None, None, -1);
        let mut expected = values.clone();
        expected.reverse();
        assert_eq!(row.slice(reversed).unwrap(), expected);

        let backwards = Slice::new(Some(4), Some(0), -2);
        assert_eq!(
            row.slice(backwards).unwrap(),
            vec![Value::from(40), Value::from(20)]
        );

        assert!(matches!(
            row.slice(Slice::new(None, None, 0)),
            Err(RowError::ZeroSliceStep)
        ));
    }

    #[test]
    fn extreme_steps_stop_instead_of_overflowing() {
        let row = row(vec![Value::from(10), Value::from(20), Value::from(30)]);

        assert_eq!(
            row.slice(Slice::new(Some(1), None, isize::MAX)).unwrap(),
            vec![Value::from(20)]
        );
        assert_eq!(
            row.slice(Slice::new(None, None, isize::MIN)).unwrap(),
            vec![Value::from(30)]
        );
        assert_eq!(
            row.slice(Slice::new(Some(isize::MIN), Some(isize::MAX), isize::MAX))
                .unwrap(),
            vec![Value::from(10)]
        );
    }

    #[test]
    fn keyed_access_matches_mapped_position() {
        let row = row(vec![Value::from(1), Value::from(2), Value::from(3)]);
        assert_eq!(row.get_by_key(&Key::from("x")).unwrap(), row.get(0).unwrap());
        assert_eq!(row.get_by_key(&Key::from("z")).unwrap(), row.get(2).unwrap());
    }

    #[test]
    fn ambiguous_key_never_returns_a_value() {
        let row = row(vec![Value::from(1), Value::from(2), Value::from(3)]);
        let err = row.get_by_key(&Key::from("y")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ambiguous);
        let message = err.to_string();
        assert!(message.contains("'y'"), "{message}");
        assert!(message.contains("ambiguous column y"), "{message}");
    }

    #[test]
    fn ambiguous_non_ascii_key_fails_to_render() {
        let mut map = KeyMap::new();
        map.insert(
            Key::from("café"),
            KeyRecord::ambiguous(Key::from("café"), "two columns"),
        );
        let row = Row::new(
            Arc::new(NoFallback),
            &[None, None],
            Arc::new(map),
            vec![Value::from(1), Value::from(2)],
        )
        .unwrap();
        let err = row.get_by_key(&Key::from("café")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }

    #[test]
    fn missing_key_uses_metadata_fallback() {
        let fallback = LowercaseFallback(KeyMap::from(vec![(
            Key::from("name"),
            KeyRecord::unique(1, Key::from("name")),
        )]));
        let row = Row::new(
            Arc::new(fallback),
            &[None, None],
            Arc::new(KeyMap::new()),
            vec![Value::from(1), Value::from("bob")],
        )
        .unwrap();

        assert_eq!(row.get_by_key(&Key::from("NAME")).unwrap(), &Value::from("bob"));
        let err = row.get_by_key(&Key::from("age")).unwrap_err();
        assert!(matches!(err, RowError::KeyNotFound(ref k) if *k == Key::from("age")));
    }

    #[test]
    fn attribute_access_remaps_only_misses() {
        let row = row(vec![Value::from(1), Value::from(2), Value::from(3)]);

        let x = row.attr("x").unwrap();
        assert_eq!(x.column(), Some(&Value::from(1)));

        let err = row.attr("nope").unwrap_err();
        assert!(matches!(err, RowError::AttributeNotFound(ref k) if *k == Key::from("nope")));

        let err = row.attr("y").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ambiguous);
    }

    #[test]
    fn reserved_fields_win_over_columns() {
        let mut map = KeyMap::new();
        map.insert(Key::from("_row"), KeyRecord::unique(0, Key::from("_row")));
        let row = Row::new(
            Arc::new(NoFallback),
            &[None],
            Arc::new(map),
            vec![Value::from(5)],
        )
        .unwrap();

        assert!(matches!(row.attr("_row").unwrap(), RowAttr::Row(values) if values == [Value::from(5)]));
        assert!(matches!(row.attr("_keymap").unwrap(), RowAttr::KeyMap(_)));
        assert!(matches!(row.attr("_parent").unwrap(), RowAttr::Parent(_)));
    }

    #[test]
    fn subscript_dispatches_on_index_type() {
        let row = row(vec![Value::from(10), Value::from(20), Value::from(30)]);
        assert_eq!(row.get_item(-1isize).unwrap(), Item::One(&Value::from(30)));
        assert_eq!(
            row.get_item(Slice::from(1isize..3)).unwrap(),
            Item::Many(vec![Value::from(20), Value::from(30)])
        );
        assert_eq!(row.get_item("z").unwrap(), Item::One(&Value::from(30)));
    }

    #[test]
    fn iteration_is_restartable() {
        let row = row(vec![Value::from(1), Value::from(2)]);
        let first: Vec<_> = row.iter().cloned().collect();
        let second: Vec<_> = (&row).into_iter().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(first, row.values());

        let mut a = row.iter();
        let mut b = row.iter();
        a.next();
        assert_eq!(b.next(), Some(&Value::from(1)));
    }

    #[test]
    fn equality_and_hash_ignore_metadata() {
        let a = row(vec![Value::from(1), Value::from("A")]);
        let b = Row::new(
            Arc::new(LowercaseFallback(KeyMap::new())),
            &[None, None],
            Arc::new(KeyMap::new()),
            vec![Value::from(1), Value::from("A")],
        )
        .unwrap();
        let c = row(vec![Value::from(1), Value::from("B")]);

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(a, c);

        let set: HashSet<_> = [a.clone(), c, a].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display_renders_value_tuple() {
        assert_eq!(row(vec![Value::from(1), Value::from("A")]).to_string(), "(1, 'A')");
        assert_eq!(row(vec![Value::Null]).to_string(), "(NULL,)");
    }

    #[test]
    fn rows_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Row<NoFallback>>();

        let row = row(vec![Value::from(1), Value::from(2), Value::from(3)]);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    assert_eq!(row.get_by_key(&Key::from("z")).unwrap(), &Value::from(3));
                    assert_eq!(row.get(-1).unwrap(), &Value::from(3));
                });
            }
        });
    }
}
