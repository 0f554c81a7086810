//! Cross-Platform Path Utilities
//!
//! Functions for resolving the AssetWorks data directory (~/.assetworks/).

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the AssetWorks directory (~/.assetworks/)
pub fn assetworks_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".assetworks"))
}

/// Get the config file path (~/.assetworks/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(assetworks_dir()?.join("config.json"))
}

/// Get the database file path (~/.assetworks/reports.db)
pub fn database_path() -> AppResult<PathBuf> {
    Ok(assetworks_dir()?.join("reports.db"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Ensure the parent directory of a file path exists
pub fn ensure_parent_dir(path: &Path) -> AppResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}
