//! Recognized configuration keys and key renaming

use crate::config::ConfigMap;
use tracing::warn;

pub const CONFIG_VERSION: &str = "config_version";
pub const SERVER: &str = "server";
pub const AUTO_CONNECT: &str = "auto_connect";
pub const AUTO_CYCLE: &str = "auto_cycle";
pub const CUSTOM_FEE: &str = "customfee";
pub const FEE_PER_KB: &str = "fee_per_kb";
pub const MAX_FEE_RATE: &str = "max_fee_rate";
pub const GUI_LAST_WALLET: &str = "gui_last_wallet";
pub const DEFAULT_WALLET_PATH: &str = "default_wallet_path";
pub const RECENTLY_OPEN: &str = "recently_open";
pub const SESSION_TIMEOUT: &str = "session_timeout";
pub const WALLET_PATH: &str = "wallet_path";
pub const DATA_PATH: &str = "data_path";
pub const TESTNET: &str = "testnet";
pub const VIDEO_DEVICE: &str = "video_device";

/// Keys renamed between releases, old name first
pub const DEPRECATED_KEYS: &[(&str, &str)] = &[(AUTO_CYCLE, AUTO_CONNECT)];

/// Move values from old key names to new ones.
///
/// For each pair present in `config`, the value is copied to the new key
/// unless the new key already has one, and the old key is removed either way.
/// Returns true if any key was renamed.
pub fn rename_config_keys(
    config: &mut ConfigMap,
    pairs: &[(&str, &str)],
    deprecation_warning: bool,
) -> bool {
    let mut updated = false;

    for (old_key, new_key) in pairs {
        let Some(value) = config.remove(*old_key) else {
            continue;
        };

        if !config.contains_key(*new_key) {
            config.insert((*new_key).to_string(), value);
            if deprecation_warning {
                warn!(
                    "Note that the {} variable has been deprecated. You should use {} instead.",
                    old_key, new_key
                );
            }
        }
        updated = true;
    }

    updated
}
