pub mod error;
pub mod key;
pub mod metadata;
pub mod processor;
pub mod value;

pub use error::{ErrorKind, ProcessError, ProcessErrorKind, RowError};
pub use key::{Key, KeyMap, KeyRecord};
pub use metadata::{NoFallback, ResultMetadata};
pub use processor::{Processor, ProcessorRef};
pub use value::Value;
