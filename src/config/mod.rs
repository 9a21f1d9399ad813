//! Configuration system
//!
//! Two layers, highest priority first:
//! 1. Command-line overrides
//! 2. User config, persisted and versioned

pub mod keys;
mod locator;
mod persistence;
mod store;
mod upgrade;
mod wallet_paths;

pub use locator::{DirectoryLocator, FixedLocator, LocationMigration, StandardLocator};
pub use persistence::{config_file_path, read_user_config, save_user_config, ConfigMap, CONFIG_FILE_NAME};
pub use store::{ConfigStore, StoreGuard};
pub use upgrade::{VersionUpgrader, FINAL_CONFIG_VERSION};
pub use wallet_paths::rebase_wallet_path;
