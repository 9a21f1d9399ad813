//! User configuration file on disk
//!
//! The persisted layer lives in `<data dir>/config` as a single pretty-printed
//! JSON object with sorted keys. Loading is fail-soft; saving is not.

use crate::types::Result;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One configuration layer: string keys to JSON values
pub type ConfigMap = Map<String, Value>;

pub const CONFIG_FILE_NAME: &str = "config";

pub fn config_file_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Read the user config from `dir`.
///
/// A missing file is a first run and yields an empty map. A file that cannot
/// be read, is not valid JSON, or is not a JSON object also yields an empty
/// map, with a warning.
pub fn read_user_config(dir: Option<&Path>) -> ConfigMap {
    let Some(dir) = dir else {
        return ConfigMap::new();
    };

    let path = config_file_path(dir);
    if !path.exists() {
        debug!("No user config at {}", path.display());
        return ConfigMap::new();
    }

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Cannot read config file {}: {}", path.display(), e);
            return ConfigMap::new();
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => {
            debug!("Loaded {} user config keys from {}", map.len(), path.display());
            map
        }
        Ok(_) => {
            warn!("Config file {} is not a JSON object, ignoring it", path.display());
            ConfigMap::new()
        }
        Err(e) => {
            warn!("Cannot parse config file {}: {}", path.display(), e);
            ConfigMap::new()
        }
    }
}

/// Write the user config into `dir` and restrict the file to its owner.
pub fn save_user_config(dir: &Path, config: &ConfigMap) -> Result<()> {
    let path = config_file_path(dir);

    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    config.serialize(&mut serializer)?;

    fs::write(&path, &buf)?;
    restrict_permissions(&path)?;

    debug!("Saved user config to {}", path.display());
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
