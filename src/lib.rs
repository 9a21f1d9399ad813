//! walletconf - layered configuration for wallet clients
//!
//! Command-line overrides sit on top of a persisted, versioned user config
//! that is migrated forward on startup. The same store keeps the live fee
//! estimate cache used to pick transaction fees.

pub mod config;
pub mod fees;
pub mod types;

pub use config::{ConfigStore, DirectoryLocator, FixedLocator, StandardLocator};
pub use fees::FeeRate;
pub use types::{ConfigError, Result};
