use std::fmt;

use crate::key::Key;

/// Error kind for row access and construction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Raw values and processors disagree in length.
    Arity,
    /// Positional access or slicing out of range.
    Index,
    /// Keyed access found no column.
    Key,
    /// Keyed access matched several columns.
    Ambiguous,
    /// Attribute-style access found neither a field nor a column.
    Attribute,
    /// Deserialized row state is incomplete or inconsistent.
    Reconstruction,
    /// Diagnostic text could not be rendered.
    Encoding,
    /// Invalid argument to a row helper.
    Argument,
    /// A column processor failed.
    Process,
}

/// Errors raised by rows, projectors and reconstruction.
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error(
        "number of values in row ({values}) differ from number of column processors ({processors})"
    )]
    ArityMismatch { values: usize, processors: usize },

    #[error("row index {index} out of range for row of length {len}")]
    IndexOutOfRange { index: isize, len: usize },

    #[error("slice step cannot be zero")]
    ZeroSliceStep,

    #[error("could not locate column in row for column '{0}'")]
    KeyNotFound(Key),

    #[error("ambiguous column name '{key}' in result set column descriptions ({context})")]
    AmbiguousKey { key: String, context: String },

    #[error("row has no attribute or column '{0}'")]
    AttributeNotFound(Key),

    #[error("row state must set values for parent, row and keymap: '{field}' is missing")]
    Reconstruction { field: &'static str },

    #[error("row state keymap refers to column {index} but the row has {len} values")]
    KeymapOutOfRange { index: usize, len: usize },

    #[error("cannot render '{escaped}' as ascii text")]
    Encoding { escaped: String },

    #[error("key projector requires at least one key")]
    EmptyProjection,

    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl RowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RowError::ArityMismatch { .. } => ErrorKind::Arity,
            RowError::IndexOutOfRange { .. } => ErrorKind::Index,
            RowError::ZeroSliceStep => ErrorKind::Argument,
            RowError::KeyNotFound(_) => ErrorKind::Key,
            RowError::AmbiguousKey { .. } => ErrorKind::Ambiguous,
            RowError::AttributeNotFound(_) => ErrorKind::Attribute,
            RowError::Reconstruction { .. } | RowError::KeymapOutOfRange { .. } => {
                ErrorKind::Reconstruction
            }
            RowError::Encoding { .. } => ErrorKind::Encoding,
            RowError::EmptyProjection => ErrorKind::Argument,
            RowError::Process(_) => ErrorKind::Process,
        }
    }
}

/// Error kind for processor failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessErrorKind {
    /// The value has a type the processor cannot handle.
    Type,
    /// The value has the right type but cannot be converted.
    Value,
    /// Bytes were not valid text.
    Encoding,
}

/// Processor error, returned by [`crate::processor::Processor::process`].
///
/// Rows surface it unchanged through [`RowError::Process`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessError {
    pub kind: ProcessErrorKind,
    pub message: String,
}

impl ProcessError {
    pub fn invalid_type(msg: impl Into<String>) -> Self {
        Self { kind: ProcessErrorKind::Type, message: msg.into() }
    }

    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Self { kind: ProcessErrorKind::Value, message: msg.into() }
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self { kind: ProcessErrorKind::Encoding, message: msg.into() }
    }

    /// Add context to the error, preserving the original kind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ProcessError {}

// ---------------------------------------------------------------------------
// From impls: standard error types to ProcessError with the matching kind
// ---------------------------------------------------------------------------

impl From<std::num::ParseIntError> for ProcessError {
    fn from(e: std::num::ParseIntError) -> Self {
        Self::invalid_value(e.to_string())
    }
}

impl From<std::num::ParseFloatError> for ProcessError {
    fn from(e: std::num::ParseFloatError) -> Self {
        Self::invalid_value(e.to_string())
    }
}

impl From<std::str::Utf8Error> for ProcessError {
    fn from(e: std::str::Utf8Error) -> Self {
        Self::encoding(e.to_string())
    }
}

impl From<std::string::FromUtf8Error> for ProcessError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Self::encoding(e.to_string())
    }
}
