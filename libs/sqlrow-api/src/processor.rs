use std::sync::Arc;

use crate::error::ProcessError;
use crate::value::Value;

/// Column-level value processor.
///
/// Turns the raw value a driver produced for a column into the value the
/// application sees. A row calls each processor once at construction and
/// surfaces its error unchanged.
pub trait Processor: Send + Sync {
    fn process(&self, value: Value) -> Result<Value, ProcessError>;
}

impl<F> Processor for F
where
    F: Fn(Value) -> Result<Value, ProcessError> + Send + Sync,
{
    fn process(&self, value: Value) -> Result<Value, ProcessError> {
        self(value)
    }
}

/// Shared handle to a processor. One per column; `None` means passthrough.
pub type ProcessorRef = Arc<dyn Processor>;

/// Wrap a closure as a [`ProcessorRef`].
pub fn processor<F>(f: F) -> Option<ProcessorRef>
where
    F: Fn(Value) -> Result<Value, ProcessError> + Send + Sync + 'static,
{
    Some(Arc::new(f))
}
