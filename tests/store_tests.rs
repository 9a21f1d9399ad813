//! Integration tests for the config store against a real data directory
//!
//! Tests cover:
//! - Loading, saving and reloading the user config
//! - Startup upgrades and fail-soft loading
//! - Wallet path handling, including the post-migration rewrite
//! - Concurrent access from several threads

use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use walletconf::config::{config_file_path, read_user_config, ConfigMap, FINAL_CONFIG_VERSION};
use walletconf::{ConfigError, ConfigStore, FixedLocator};

fn map(value: Value) -> ConfigMap {
    value.as_object().cloned().expect("object literal")
}

fn write_config(dir: &Path, value: Value) {
    fs::write(config_file_path(dir), serde_json::to_string(&value).unwrap()).unwrap();
}

fn open(dir: &Path, overrides: Value) -> ConfigStore {
    ConfigStore::open(map(overrides), &FixedLocator::new(dir)).expect("store opens")
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_first_run_creates_current_version() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path(), json!({}));

    assert_eq!(store.config_version(), FINAL_CONFIG_VERSION);
    assert!(!config_file_path(dir.path()).exists(), "nothing saved until a write");

    store.set("auto_connect", true).unwrap();
    assert_eq!(
        read_user_config(Some(dir.path())),
        map(json!({"config_version": FINAL_CONFIG_VERSION, "auto_connect": true}))
    );
}

#[test]
fn test_values_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = open(dir.path(), json!({}));
        store.set("recently_open", json!(["/w/one", "/w/two"])).unwrap();
        store.set_session_timeout(900).unwrap();
        store.set_with("gap_limit", json!(30), false).unwrap();
        store.save().unwrap();
    }

    let store = open(dir.path(), json!({}));
    assert_eq!(store.get("recently_open"), Some(json!(["/w/one", "/w/two"])));
    assert_eq!(store.session_timeout().unwrap(), 900);
    assert_eq!(store.get("gap_limit"), Some(json!(30)));
}

#[test]
fn test_override_never_persisted() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path(), json!({"server": "cli.example:50002:s"}));

    store.set("server", "other.example:50002:s").unwrap();
    store.set("auto_connect", false).unwrap();

    assert_eq!(store.get("server"), Some(json!("cli.example:50002:s")));
    let saved = read_user_config(Some(dir.path()));
    assert!(!saved.contains_key("server"));
    assert_eq!(saved.get("auto_connect"), Some(&json!(false)));
}

#[test]
fn test_corrupt_config_starts_fresh() {
    let dir = TempDir::new().unwrap();
    fs::write(config_file_path(dir.path()), "not json at all").unwrap();

    let store = open(dir.path(), json!({}));
    assert_eq!(store.user_config(), map(json!({"config_version": FINAL_CONFIG_VERSION})));
}

#[test]
fn test_obsolete_file_removed() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("recent_servers"), "[]").unwrap();

    let _store = open(dir.path(), json!({}));
    assert!(!dir.path().join("recent_servers").exists());
}

#[test]
fn test_testnet_uses_subdirectory() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path(), json!({"testnet": true}));

    assert_eq!(store.data_dir(), Some(dir.path().join("testnet").as_path()));
    store.set("auto_connect", true).unwrap();
    assert!(config_file_path(&dir.path().join("testnet")).exists());
}

#[test]
fn test_data_path_override_replaces_locator() {
    let located = TempDir::new().unwrap();
    let chosen = TempDir::new().unwrap();
    let overrides = json!({"data_path": chosen.path().to_string_lossy()});

    let store = open(located.path(), overrides);
    assert_eq!(store.data_dir(), Some(chosen.path()));
}

// ============================================================================
// Upgrades
// ============================================================================

#[test]
fn test_upgrade_on_open_is_saved() {
    let dir = TempDir::new().unwrap();
    write_config(
        dir.path(),
        json!({"config_version": 1, "auto_cycle": true, "server": "host:1234:t"}),
    );

    let store = open(dir.path(), json!({}));
    let expected = map(json!({
        "config_version": FINAL_CONFIG_VERSION,
        "auto_connect": true,
        "server": "host:1234:s",
    }));
    assert_eq!(store.user_config(), expected);
    assert_eq!(read_user_config(Some(dir.path())), expected);
}

#[test]
fn test_upgrade_drops_bad_server() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), json!({"server": "not-a-valid-string"}));

    let store = open(dir.path(), json!({}));
    assert_eq!(store.get("server"), None);
    assert_eq!(store.config_version(), FINAL_CONFIG_VERSION);
}

#[test]
fn test_impossible_version_aborts_open() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), json!({"config_version": -3}));

    let result = ConfigStore::open(ConfigMap::new(), &FixedLocator::new(dir.path()));
    assert!(matches!(result, Err(ConfigError::InconsistentVersion { found: -3, .. })));
}

#[test]
fn test_reopen_after_upgrade_is_stable() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), json!({"config_version": 1, "server": "h:1:t"}));

    let first = open(dir.path(), json!({})).user_config();
    let second = open(dir.path(), json!({})).user_config();
    assert_eq!(first, second);
}

// ============================================================================
// Wallet paths
// ============================================================================

#[test]
fn test_wallet_paths_rewritten_after_migration() {
    let old_dir = TempDir::new().unwrap();
    let new_dir = TempDir::new().unwrap();
    let old = old_dir.path().to_string_lossy().into_owned();

    write_config(
        new_dir.path(),
        json!({
            "config_version": 2,
            "gui_last_wallet": format!("{}/wallets/main", old),
            "default_wallet_path": "wallets/main",
            "recently_open": [format!("{}/wallets/main", old), "/elsewhere/w"],
        }),
    );

    let locator = FixedLocator::new(new_dir.path()).migrated_from(old_dir.path());
    let store = ConfigStore::open(ConfigMap::new(), &locator).unwrap();

    let new_wallet = new_dir.path().join("wallets").join("main").to_string_lossy().into_owned();
    assert_eq!(store.get("gui_last_wallet"), Some(json!(new_wallet)));
    assert_eq!(store.get("default_wallet_path"), Some(json!("wallets/main")));
    assert_eq!(store.get("recently_open"), Some(json!([new_wallet, "/elsewhere/w"])));
    assert_eq!(read_user_config(Some(new_dir.path())), store.user_config());
}

#[test]
fn test_default_wallet_path_created() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path(), json!({}));

    let wallet = store.wallet_path(Path::new("/work")).unwrap();
    assert_eq!(wallet, Path::new("wallets").join("default_wallet"));
    assert!(dir.path().join("wallets").is_dir());
    assert_eq!(
        store.full_wallet_path(Path::new("/work")).unwrap(),
        dir.path().join("wallets").join("default_wallet")
    );
}

#[test]
fn test_legacy_wallet_moved() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("electrum.dat"), "legacy").unwrap();

    let store = open(dir.path(), json!({}));
    store.wallet_path(Path::new("/work")).unwrap();

    assert!(!dir.path().join("electrum.dat").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("wallets").join("default_wallet")).unwrap(),
        "legacy"
    );
}

#[test]
fn test_existing_default_wallet_path_used() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("wallets")).unwrap();
    fs::write(dir.path().join("wallets").join("savings"), "").unwrap();
    write_config(dir.path(), json!({"config_version": 2, "default_wallet_path": "wallets/savings"}));

    let store = open(dir.path(), json!({}));
    assert_eq!(store.wallet_path(Path::new("/work")).unwrap(), Path::new("wallets/savings"));
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_writers_and_fee_updates() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open(dir.path(), json!({})));

    let handles: Vec<_> = (0..4u32)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..25u64 {
                    store.set(&format!("worker_{}", worker), i).unwrap();
                    store.update_fee_estimate([25, 10, 5, 2][worker as usize], 1000.0 + i as f64);
                    let _ = store.dynamic_fee(4).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for worker in 0..4 {
        assert_eq!(store.get(&format!("worker_{}", worker)), Some(json!(24)));
    }
    assert!(store.has_full_fee_estimates());
    assert_eq!(store.fee_estimate(2), Some(1024.0));

    let saved = read_user_config(Some(dir.path()));
    assert_eq!(saved.len(), 5);
}

#[test]
fn test_locked_sequence_is_atomic() {
    let store = Arc::new(ConfigStore::in_memory(ConfigMap::new(), ConfigMap::new()).unwrap());
    store.set("counter", 0).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..50 {
                    let _guard = store.lock();
                    let current = store.get_as::<u64>("counter", "a non-negative integer").unwrap().unwrap();
                    store.set("counter", current + 1).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(store.get("counter"), Some(json!(400)));
}

#[test]
fn test_decimal_fee_settings_from_file() {
    let dir = TempDir::new().unwrap();
    write_config(
        dir.path(),
        json!({"config_version": 2, "fee_per_kb": 1500.0, "max_fee_rate": 2000.0}),
    );

    let store = open(dir.path(), json!({}));
    assert_eq!(store.fee_per_kb().unwrap(), 1500.0);
    store.update_fee_estimate(2, 1001.0);
    assert_eq!(store.dynamic_fee(4).unwrap(), Some(1501.5));
}
