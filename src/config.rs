//! Centralized configuration for plugstack.
//!
//! File names, extensions and pack-time exclusion lists live here. The
//! plugins root can be overridden by an environment variable, enabling
//! per-deployment plugin directories without code changes.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Manifest file name expected at the root of every plugin directory
/// and every plugin package.
pub const METADATA_FILENAME: &str = "metadata.yml";

/// Default plugin package file extension (must start with `.`).
pub const DEFAULT_PACKAGE_EXT: &str = ".psp";

/// Sentinel category used when a manifest declares none.
pub const DEFAULT_CATEGORY: &str = "default";

/// File extensions excluded from plugin packages at pack time.
pub const SKIP_FILE_EXTENSIONS: &[&str] = &["pyc", "o", "so"];

/// Directory names excluded from plugin packages at pack time.
pub const SKIP_DIR_NAMES: &[&str] = &["__pycache__", ".cache"];

/// Environment variable overriding the default plugins root.
pub const PLUGINS_DIR_ENV: &str = "PLUGSTACK_PLUGINS_DIR";

/// Get the plugins root from the environment or the default
/// `~/.plugstack/plugins`.
pub fn default_plugins_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(PLUGINS_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().ok_or_else(|| Error::Path {
        path: PathBuf::from("~"),
        reason: "could not find home directory".to_string(),
    })?;
    let dir = home.join(".plugstack/plugins");
    log::debug!("plugins dir: {:?}", dir);
    Ok(dir)
}
