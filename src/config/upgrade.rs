//! Config version upgrades
//!
//! Each migration covers a range of stored versions. Upgrading walks the
//! migrations in order under the store lock, skipping those already applied,
//! and finishes by stamping [`FINAL_CONFIG_VERSION`].

use crate::config::keys::{self, rename_config_keys, DEPRECATED_KEYS};
use crate::config::ConfigStore;
use crate::types::{ConfigError, Result};
use serde_json::{json, Value};
use tracing::{debug, info};

pub const FINAL_CONFIG_VERSION: i64 = 2;

struct Migration {
    name: &'static str,
    min_version: i64,
    max_version: i64,
    apply: fn(&ConfigStore) -> Result<()>,
}

const MIGRATIONS: &[Migration] = &[Migration {
    name: "v1 -> v2",
    min_version: 1,
    max_version: 1,
    apply: convert_version_2,
}];

pub struct VersionUpgrader<'a> {
    store: &'a ConfigStore,
}

impl<'a> VersionUpgrader<'a> {
    pub fn new(store: &'a ConfigStore) -> Self {
        Self { store }
    }

    pub fn requires_upgrade(&self) -> bool {
        self.store.config_version() < FINAL_CONFIG_VERSION
    }

    /// Apply every pending migration and save the result.
    ///
    /// Fails only when the stored version sits below a migration's range,
    /// which means the version history is corrupt.
    pub fn run(&self) -> Result<()> {
        let _guard = self.store.lock();
        info!("Upgrading config from version {}", self.store.config_version());

        for migration in MIGRATIONS {
            if !self.is_needed(migration)? {
                debug!("Config migration {} already applied", migration.name);
                continue;
            }

            debug!("Applying config migration {}", migration.name);
            (migration.apply)(self.store)?;
            self.store
                .set_user(keys::CONFIG_VERSION, json!(migration.max_version + 1), false)?;
        }

        self.store
            .set_user(keys::CONFIG_VERSION, json!(FINAL_CONFIG_VERSION), true)
    }

    fn is_needed(&self, migration: &Migration) -> Result<bool> {
        let current = self.store.config_version();
        if current > migration.max_version {
            Ok(false)
        } else if current < migration.min_version {
            Err(ConfigError::InconsistentVersion {
                found: current,
                min: migration.min_version,
                max: migration.max_version,
            })
        } else {
            Ok(true)
        }
    }
}

fn convert_version_2(store: &ConfigStore) -> Result<()> {
    store.with_user_mut(|user| rename_config_keys(user, DEPRECATED_KEYS, false));

    let Some(server) = store.user_config().get(keys::SERVER).cloned() else {
        return Ok(());
    };

    match normalize_server(&server) {
        Some(server) => store.set_user(keys::SERVER, Value::String(server), false),
        None => {
            debug!("Dropping unparsable server setting {}", server);
            store.set_user(keys::SERVER, Value::Null, false)
        }
    }
}

/// Rewrite `host:port:protocol` as `host:port:s`.
fn normalize_server(value: &Value) -> Option<String> {
    let text = value.as_str()?;

    let mut parts = text.rsplitn(3, ':');
    let protocol = parts.next()?;
    let port = parts.next()?;
    let host = parts.next()?;

    if protocol != "s" && protocol != "t" {
        return None;
    }
    port.trim().parse::<i64>().ok()?;

    Some(format!("{}:{}:s", host, port))
}
