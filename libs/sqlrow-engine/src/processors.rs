use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sqlrow_api::{ProcessError, Processor, ProcessorRef, Value};

/// Built-in column processors, selectable by name from configuration.
///
/// `NULL` passes through every processor unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    Upper,
    Lower,
    Trim,
    Int64,
    Float64,
    Bool,
    /// Any value to its text form.
    Text,
    /// UTF-8 bytes to text.
    Utf8,
}

impl ProcessorKind {
    pub fn into_ref(self) -> ProcessorRef {
        Arc::new(self)
    }
}

impl Processor for ProcessorKind {
    fn process(&self, value: Value) -> Result<Value, ProcessError> {
        if value.is_null() {
            return Ok(value);
        }
        match self {
            ProcessorKind::Upper => map_string(value, |s| s.to_uppercase()),
            ProcessorKind::Lower => map_string(value, |s| s.to_lowercase()),
            ProcessorKind::Trim => map_string(value, |s| s.trim().to_string()),
            ProcessorKind::Int64 => to_int64(value),
            ProcessorKind::Float64 => to_float64(value),
            ProcessorKind::Bool => to_bool(value),
            ProcessorKind::Text => Ok(match value {
                Value::String(s) => Value::String(s),
                other => Value::String(other.to_string()),
            }),
            ProcessorKind::Utf8 => match value {
                Value::Bytes(bytes) => Ok(Value::String(String::from_utf8(bytes)?)),
                Value::String(s) => Ok(Value::String(s)),
                other => Err(unsupported("utf8", &other)),
            },
        }
    }
}

fn unsupported(processor: &str, value: &Value) -> ProcessError {
    ProcessError::invalid_type(format!(
        "{processor} processor cannot handle {} value",
        value.kind_name()
    ))
}

fn map_string(value: Value, f: impl FnOnce(&str) -> String) -> Result<Value, ProcessError> {
    match value {
        Value::String(s) => Ok(Value::String(f(&s))),
        other => Err(unsupported("string", &other)),
    }
}

fn to_int64(value: Value) -> Result<Value, ProcessError> {
    match value {
        Value::Int64(v) => Ok(Value::Int64(v)),
        Value::UInt64(v) => i64::try_from(v)
            .map(Value::Int64)
            .map_err(|_| ProcessError::invalid_value(format!("{v} overflows int64"))),
        Value::Bool(v) => Ok(Value::Int64(i64::from(v))),
        Value::Float64(v) if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 => {
            Ok(Value::Int64(v as i64))
        }
        Value::Float64(v) => Err(ProcessError::invalid_value(format!(
            "{v} is not an integral int64"
        ))),
        Value::String(s) => Ok(Value::Int64(s.trim().parse::<i64>()?)),
        other => Err(unsupported("int64", &other)),
    }
}

fn to_float64(value: Value) -> Result<Value, ProcessError> {
    match value {
        Value::Float64(v) => Ok(Value::Float64(v)),
        Value::Float32(v) => Ok(Value::Float64(f64::from(v))),
        Value::Int64(v) => Ok(Value::Float64(v as f64)),
        Value::UInt64(v) => Ok(Value::Float64(v as f64)),
        Value::Decimal(v, scale) => Ok(Value::Float64(v as f64 / 10f64.powi(i32::from(scale)))),
        Value::String(s) => Ok(Value::Float64(s.trim().parse::<f64>()?)),
        other => Err(unsupported("float64", &other)),
    }
}

fn to_bool(value: Value) -> Result<Value, ProcessError> {
    match value {
        Value::Bool(v) => Ok(Value::Bool(v)),
        Value::Int64(v) => Ok(Value::Bool(v != 0)),
        Value::UInt64(v) => Ok(Value::Bool(v != 0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "1" => Ok(Value::Bool(true)),
            "false" | "f" | "no" | "0" => Ok(Value::Bool(false)),
            _ => Err(ProcessError::invalid_value(format!("'{s}' is not a boolean"))),
        },
        other => Err(unsupported("bool", &other)),
    }
}
