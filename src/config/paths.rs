//! Platform-specific config location.
//!
//! Uses the `dirs` crate to resolve the platform config directory:
//! - Linux:   `~/.config/imgspeed/config.toml`
//! - Windows: `%APPDATA%\imgspeed\config.toml`
//! - macOS:   `~/Library/Application Support/imgspeed/config.toml`

use std::path::PathBuf;

const APP_DIR: &str = "imgspeed";
const CONFIG_FILE: &str = "config.toml";

/// Path of the default config file, if the platform has a config directory.
///
/// The file is not created; a missing file means defaults.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join(APP_DIR).join(CONFIG_FILE))
}
