use thiserror::Error;
use std::path::PathBuf;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config upgrade: unexpected version {found} (should be {min}-{max})")]
    InconsistentVersion { found: i64, min: i64, max: i64 },

    #[error("config key '{key}' holds {found}, expected {expected}")]
    Decode {
        key: String,
        expected: &'static str,
        found: String,
    },

    #[error("Invalid override '{0}': expected key=value")]
    InvalidOverride(String),

    #[error("No data directory configured")]
    NoDataDir,

    #[error("Data directory unavailable: {}", .0.display())]
    DataDirUnavailable(PathBuf),

    #[error("Dynamic fee index out of range: {0}")]
    FeeIndexOutOfRange(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn decode<K: Into<String>>(key: K, expected: &'static str, found: &serde_json::Value) -> Self {
        Self::Decode {
            key: key.into(),
            expected,
            found: describe(found).to_string(),
        }
    }
}

fn describe(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
