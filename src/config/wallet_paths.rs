//! Wallet path fix-ups after a data directory move

use path_clean::PathClean;
use std::path::Path;

/// Rebase `path` from `old_dir` onto `new_dir`.
///
/// Only absolute paths that lie inside `old_dir` change. Relative paths are
/// already relative to the data directory and are returned as given.
pub fn rebase_wallet_path(path: &str, old_dir: &Path, new_dir: &Path) -> String {
    let candidate = Path::new(path);
    if !candidate.is_absolute() {
        return path.to_string();
    }

    let cleaned = candidate.clean();
    match cleaned.strip_prefix(old_dir.clean()) {
        Ok(rest) => new_dir.join(rest).clean().to_string_lossy().into_owned(),
        Err(_) => path.to_string(),
    }
}
