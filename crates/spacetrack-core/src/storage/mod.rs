mod config;
pub mod database;
pub mod migrations;
pub mod traits;

pub use config::{Config, DisplayConfig, EngineConfig};
pub use database::Database;
pub use traits::{
    CatalogRepository, LogRepository, NoteRepository, SpaceRepository, Store, WasteRepository,
};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/spacetrack[-dev]/` based on SPACETRACK_ENV.
///
/// Set SPACETRACK_ENV=dev to use the development data directory, or
/// SPACETRACK_HOME to point at an explicit directory.
///
/// # Errors
/// Returns an error if creating the data directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("SPACETRACK_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("SPACETRACK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("spacetrack-dev")
            } else {
                base_dir.join("spacetrack")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
