pub mod config;
pub mod error;
pub mod metadata;
pub mod processors;
pub mod projector;
pub mod reconstruct;
pub mod result;
pub mod row;

pub use config::{ColumnConfig, ResultSetConfig};
pub use error::EngineError;
pub use metadata::{ColumnDescription, ColumnMetadata};
pub use processors::ProcessorKind;
pub use projector::KeyProjector;
pub use reconstruct::{Reconstruct, RowSlots, RowState, reconstruct};
pub use result::ResultSet;
pub use row::{Item, Row, RowAttr, RowIndex, Slice};
