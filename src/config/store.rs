//! Layered configuration store
//!
//! Two layers, read in priority order:
//! 1. Command-line overrides (fixed at startup, never written to)
//! 2. User config (persisted in `<data dir>/config`)
//!
//! Every read and write goes through one reentrant lock, which also guards
//! the in-memory fee estimate cache. Upgrade steps re-enter the public API
//! while already holding it.

use crate::config::keys::{self, rename_config_keys, DEPRECATED_KEYS};
use crate::config::locator::DirectoryLocator;
use crate::config::persistence::{read_user_config, save_user_config, ConfigMap};
use crate::config::upgrade::{VersionUpgrader, FINAL_CONFIG_VERSION};
use crate::config::wallet_paths::rebase_wallet_path;
use crate::fees::FeeCache;
use crate::types::{ConfigError, Result};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DEFAULT_SESSION_TIMEOUT: u64 = 300;
const OBSOLETE_FILES: &[&str] = &["recent_servers"];

/// Everything the store lock guards
pub(crate) struct StoreState {
    overrides: ConfigMap,
    user: ConfigMap,
    pub(crate) fees: FeeCache,
}

/// Held lock over the whole store; see [`ConfigStore::lock`].
///
/// Only holds the lock. Reads and writes still go through the store.
#[must_use = "the store is unlocked as soon as the guard is dropped"]
pub struct StoreGuard<'a> {
    _lock: ReentrantMutexGuard<'a, RefCell<StoreState>>,
}

pub struct ConfigStore {
    /// Directory holding the config file; `None` keeps everything in memory
    data_dir: Option<PathBuf>,

    state: ReentrantMutex<RefCell<StoreState>>,
}

impl ConfigStore {
    /// Open the store backed by the directory `locator` resolves.
    ///
    /// A `data_path` override replaces the located directory and skips the
    /// legacy migration check. The only fatal outcome is an inconsistent
    /// stored config version.
    pub fn open(overrides: ConfigMap, locator: &dyn DirectoryLocator) -> Result<Self> {
        let (base_dir, migrated_from) = match overrides.get(keys::DATA_PATH).and_then(Value::as_str) {
            Some(path) => (Some(PathBuf::from(path)), None),
            None => match locator.migrate_if_needed() {
                Some(migration) => (Some(migration.data_dir), migration.migrated_from),
                None => (locator.user_dir(), None),
            },
        };

        let testnet = overrides
            .get(keys::TESTNET)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let data_dir = match base_dir {
            Some(base) => Some(prepare_data_dir(base, testnet)?),
            None => {
                warn!("No user data directory available, config will not be saved");
                None
            }
        };

        let user = read_user_config(data_dir.as_deref());
        Self::initialize(data_dir, overrides, user, migrated_from)
    }

    /// Build a store with no backing file. Saves are skipped.
    pub fn in_memory(overrides: ConfigMap, user: ConfigMap) -> Result<Self> {
        Self::initialize(None, overrides, user, None)
    }

    fn initialize(
        data_dir: Option<PathBuf>,
        mut overrides: ConfigMap,
        mut user: ConfigMap,
        migrated_from: Option<PathBuf>,
    ) -> Result<Self> {
        // config_version may not be set on the command line
        overrides.remove(keys::CONFIG_VERSION);
        rename_config_keys(&mut overrides, DEPRECATED_KEYS, true);

        if user.is_empty() {
            // a fresh config is already at the current version
            user.insert(keys::CONFIG_VERSION.to_string(), json!(FINAL_CONFIG_VERSION));
        }

        let store = Self {
            data_dir,
            state: ReentrantMutex::new(RefCell::new(StoreState {
                overrides,
                user,
                fees: FeeCache::default(),
            })),
        };

        let upgrader = VersionUpgrader::new(&store);
        if upgrader.requires_upgrade() {
            upgrader.run()?;
        }

        if let Some(old_dir) = migrated_from {
            store.upgrade_wallet_paths(&old_dir)?;
        }

        Ok(store)
    }

    /// Take the store lock for a sequence of calls that must not interleave
    /// with other threads. The lock is reentrant, so the regular API remains
    /// usable while the guard is held.
    pub fn lock(&self) -> StoreGuard<'_> {
        StoreGuard {
            _lock: self.state.lock(),
        }
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Override value if present and non-null, else the user config value.
    pub fn get(&self, key: &str) -> Option<Value> {
        let guard = self.state.lock();
        let state = guard.borrow();

        match state.overrides.get(key) {
            Some(value) if !value.is_null() => Some(value.clone()),
            _ => state.user.get(key).cloned(),
        }
    }

    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// Typed read; a value of the wrong shape is a [`ConfigError::Decode`]
    /// naming `expected`, e.g. `"a string"`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str, expected: &'static str) -> Result<Option<T>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|_| ConfigError::decode(key, expected, &value)),
        }
    }

    /// Set a key in the user config and save it.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.set_with(key, value.into(), true)
    }

    /// Remove a key from the user config and save it.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.set_with(key, Value::Null, true)
    }

    /// Set or (with `null`) remove a key in the user config.
    ///
    /// Keys given on the command line are left alone with a warning.
    pub fn set_with(&self, key: &str, value: Value, persist: bool) -> Result<()> {
        if !self.is_modifiable(key) {
            warn!("Not changing config key '{}' set on the command line", key);
            return Ok(());
        }
        self.set_user(key, value, persist)
    }

    pub(crate) fn set_user(&self, key: &str, value: Value, persist: bool) -> Result<()> {
        let guard = self.state.lock();
        {
            let mut state = guard.borrow_mut();
            if value.is_null() {
                state.user.remove(key);
            } else {
                state.user.insert(key.to_string(), value);
            }
        }

        if persist {
            self.save()?;
        }
        Ok(())
    }

    pub fn is_modifiable(&self, key: &str) -> bool {
        let guard = self.state.lock();
        let modifiable = !guard.borrow().overrides.contains_key(key);
        modifiable
    }

    /// Write the user config to disk. A store without a data directory
    /// has nothing to write.
    pub fn save(&self) -> Result<()> {
        let Some(dir) = self.data_dir.as_deref() else {
            debug!("No data directory, skipping config save");
            return Ok(());
        };

        let guard = self.state.lock();
        let state = guard.borrow();
        save_user_config(dir, &state.user)
    }

    /// Snapshot of the user config layer
    pub fn user_config(&self) -> ConfigMap {
        self.state.lock().borrow().user.clone()
    }

    /// Snapshot of the command-line override layer
    pub fn overrides(&self) -> ConfigMap {
        self.state.lock().borrow().overrides.clone()
    }

    /// Both layers merged the way [`get`](Self::get) resolves them
    pub fn merged(&self) -> ConfigMap {
        let guard = self.state.lock();
        let state = guard.borrow();

        let mut merged = state.user.clone();
        for (key, value) in &state.overrides {
            if !value.is_null() {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    /// Stored config version; an absent or non-integer value counts as 1.
    pub fn config_version(&self) -> i64 {
        let version = match self.get(keys::CONFIG_VERSION) {
            None => 1,
            Some(value) => match value.as_i64() {
                Some(version) => version,
                None => {
                    warn!("Ignoring malformed config version {}", value);
                    1
                }
            },
        };

        if version > FINAL_CONFIG_VERSION {
            warn!(
                "Config version ({}) is higher than ours ({})",
                version, FINAL_CONFIG_VERSION
            );
        }
        version
    }

    pub fn requires_upgrade(&self) -> bool {
        VersionUpgrader::new(self).requires_upgrade()
    }

    /// Run pending config migrations
    pub fn upgrade(&self) -> Result<()> {
        VersionUpgrader::new(self).run()
    }

    pub(crate) fn with_user_mut<R>(&self, f: impl FnOnce(&mut ConfigMap) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state.user)
    }

    pub(crate) fn with_state_mut<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut *state)
    }

    /// Point stored wallet paths at the new data directory after its
    /// contents were copied over from `old_dir`.
    fn upgrade_wallet_paths(&self, old_dir: &Path) -> Result<()> {
        let Some(new_dir) = self.data_dir.clone() else {
            return Ok(());
        };
        info!(
            "Rewriting wallet paths from {} to {}",
            old_dir.display(),
            new_dir.display()
        );

        let _guard = self.lock();
        self.with_user_mut(|user| {
            for key in [keys::GUI_LAST_WALLET, keys::DEFAULT_WALLET_PATH] {
                if let Some(Value::String(path)) = user.get_mut(key) {
                    *path = rebase_wallet_path(path, old_dir, &new_dir);
                }
            }

            if let Some(Value::Array(recent)) = user.get_mut(keys::RECENTLY_OPEN) {
                for entry in recent.iter_mut() {
                    if let Value::String(path) = entry {
                        *path = rebase_wallet_path(path, old_dir, &new_dir);
                    }
                }
            }
        });
        self.save()
    }

    /// Wallet to open, relative to the data directory unless given on the
    /// command line.
    pub fn wallet_path(&self, cwd: &Path) -> Result<PathBuf> {
        if let Some(wallet) = self.get_as::<String>(keys::WALLET_PATH, "a string")? {
            return Ok(cwd.join(wallet));
        }

        let data_dir = self.data_dir.as_deref().ok_or(ConfigError::NoDataDir)?;

        if let Some(path) = self.get_as::<String>(keys::DEFAULT_WALLET_PATH, "a string")? {
            if data_dir.join(&path).exists() {
                return Ok(PathBuf::from(path));
            }
        }

        if !data_dir.is_dir() {
            return Err(ConfigError::DataDirUnavailable(data_dir.to_path_buf()));
        }
        fs::create_dir_all(data_dir.join("wallets"))?;

        let new_path = Path::new("wallets").join("default_wallet");
        let legacy = data_dir.join("electrum.dat");
        if legacy.exists() && !data_dir.join(&new_path).exists() {
            info!("Moving legacy wallet {} into wallets/", legacy.display());
            fs::rename(&legacy, data_dir.join(&new_path))?;
        }

        Ok(new_path)
    }

    pub fn full_wallet_path(&self, cwd: &Path) -> Result<PathBuf> {
        let wallet = self.wallet_path(cwd)?;
        match self.data_dir.as_deref() {
            Some(dir) => Ok(dir.join(wallet)),
            None => Ok(wallet),
        }
    }

    pub fn remove_from_recently_open(&self, path: &str) -> Result<()> {
        let _guard = self.lock();
        let mut recent = self
            .get_as::<Vec<String>>(keys::RECENTLY_OPEN, "a list of strings")?
            .unwrap_or_default();

        if let Some(pos) = recent.iter().position(|entry| entry == path) {
            recent.remove(pos);
            self.set(keys::RECENTLY_OPEN, json!(recent))?;
        }
        Ok(())
    }

    /// Remember the last opened wallet, unless the wallet was chosen on the
    /// command line.
    pub fn save_last_wallet(&self, path: &Path) -> Result<()> {
        if self.get(keys::WALLET_PATH).is_some() {
            return Ok(());
        }
        self.set(keys::GUI_LAST_WALLET, path.to_string_lossy().into_owned())
    }

    pub fn session_timeout(&self) -> Result<u64> {
        Ok(self
            .get_as::<u64>(keys::SESSION_TIMEOUT, "a non-negative integer")?
            .unwrap_or(DEFAULT_SESSION_TIMEOUT))
    }

    pub fn set_session_timeout(&self, seconds: u64) -> Result<()> {
        debug!("session timeout -> {} seconds", seconds);
        self.set(keys::SESSION_TIMEOUT, seconds)
    }

    /// Configured video device; `"default"` means the empty device name.
    pub fn video_device(&self) -> Result<String> {
        let device = self
            .get_as::<String>(keys::VIDEO_DEVICE, "a string")?
            .unwrap_or_else(|| "default".to_string());

        if device == "default" {
            Ok(String::new())
        } else {
            Ok(device)
        }
    }
}

fn prepare_data_dir(base: PathBuf, testnet: bool) -> Result<PathBuf> {
    fs::create_dir_all(&base)?;

    let dir = if testnet {
        let dir = base.join("testnet");
        fs::create_dir_all(&dir)?;
        dir
    } else {
        base
    };

    for name in OBSOLETE_FILES {
        let obsolete = dir.join(name);
        if obsolete.exists() {
            debug!("Removing obsolete file {}", obsolete.display());
            fs::remove_file(&obsolete)?;
        }
    }

    info!("Data directory: {}", dir.display());
    Ok(dir)
}
