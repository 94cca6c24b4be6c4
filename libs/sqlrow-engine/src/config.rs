use std::path::Path;

use serde::Deserialize;

use sqlrow_api::ProcessorRef;

use crate::error::EngineError;
use crate::metadata::ColumnDescription;
use crate::processors::ProcessorKind;

/// Result-set layout, parsed from TOML.
///
/// ```toml
/// case_sensitive = false
///
/// [[columns]]
/// name = "id"
/// table = "users"
///
/// [[columns]]
/// name = "name"
/// processor = "upper"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ResultSetConfig {
    /// Whether key lookups fall back to case-insensitive matching when `false`.
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,

    /// Columns in result order.
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

fn default_case_sensitive() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub processor: Option<ProcessorKind>,
}

impl ResultSetConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&content).map_err(|e| e.with_context(path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn descriptions(&self) -> Vec<ColumnDescription> {
        self.columns
            .iter()
            .map(|c| ColumnDescription {
                name: c.name.clone(),
                table: c.table.clone(),
            })
            .collect()
    }

    /// One entry per column; `None` where no processor is configured.
    pub fn processors(&self) -> Vec<Option<ProcessorRef>> {
        self.columns
            .iter()
            .map(|c| c.processor.map(ProcessorKind::into_ref))
            .collect()
    }
}
