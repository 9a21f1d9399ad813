//! User data directory resolution
//!
//! Discovering platform directories and copying files out of a legacy
//! location happen behind [`DirectoryLocator`]; the store only consumes the
//! resulting path and whether a move just took place.

use std::path::PathBuf;
use tracing::debug;

const APP_DIR_NAME: &str = "walletconf";

/// Outcome of a data directory migration check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationMigration {
    /// Directory the application should use from now on
    pub data_dir: PathBuf,
    /// Legacy directory the data was copied from, if a copy just happened
    pub migrated_from: Option<PathBuf>,
}

pub trait DirectoryLocator: Send + Sync {
    /// Base user data directory, if one can be determined
    fn user_dir(&self) -> Option<PathBuf>;

    /// Move data out of a legacy directory when that applies.
    ///
    /// Implementations log copy failures and report no migration, leaving
    /// the application on the old directory.
    fn migrate_if_needed(&self) -> Option<LocationMigration>;
}

/// Platform data directory, without any legacy copy
#[derive(Debug, Default, Clone)]
pub struct StandardLocator;

impl DirectoryLocator for StandardLocator {
    fn user_dir(&self) -> Option<PathBuf> {
        if let Some(data_dir) = dirs::data_dir() {
            return Some(data_dir.join(APP_DIR_NAME));
        }

        dirs::home_dir().map(|home| home.join(format!(".{}", APP_DIR_NAME)))
    }

    fn migrate_if_needed(&self) -> Option<LocationMigration> {
        let data_dir = self.user_dir()?;
        debug!("Standard data directory: {}", data_dir.display());
        Some(LocationMigration {
            data_dir,
            migrated_from: None,
        })
    }
}

/// An explicit directory, optionally reporting a completed migration
#[derive(Debug, Clone)]
pub struct FixedLocator {
    dir: PathBuf,
    migrated_from: Option<PathBuf>,
}

impl FixedLocator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            migrated_from: None,
        }
    }

    /// Report that data was just copied into this directory from `old_dir`
    pub fn migrated_from(mut self, old_dir: impl Into<PathBuf>) -> Self {
        self.migrated_from = Some(old_dir.into());
        self
    }
}

impl DirectoryLocator for FixedLocator {
    fn user_dir(&self) -> Option<PathBuf> {
        Some(self.dir.clone())
    }

    fn migrate_if_needed(&self) -> Option<LocationMigration> {
        Some(LocationMigration {
            data_dir: self.dir.clone(),
            migrated_from: self.migrated_from.clone(),
        })
    }
}
