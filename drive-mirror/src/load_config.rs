/// `load_config` module: loads the static JSON sync configuration and applies
/// environment overrides.
///
/// # Responsibilities
/// - Parse the user-supplied JSON file into the core [`SyncConfig`]
/// - Apply `DRIVE_FOLDER_ID`, when set and non-empty, over `source.folderId`
/// - Produce clear diagnostics for the CLI: every failure carries the path
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use drive_mirror_core::config::SyncConfig;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Environment variable overriding the configured source folder id.
pub const FOLDER_ID_ENV: &str = "DRIVE_FOLDER_ID";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SyncConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: SyncConfig = match serde_json::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config JSON successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config JSON");
            return Err(anyhow::anyhow!("Failed to parse config JSON {:?}: {e}", path_ref));
        }
    };

    let config = config.with_folder_override(std::env::var(FOLDER_ID_ENV).ok());
    if config.source.folder_id.trim().is_empty() {
        return Err(anyhow::anyhow!(
            "No source folder id: set source.folderId in {:?} or {FOLDER_ID_ENV}",
            path_ref
        ));
    }

    config.trace_loaded();
    Ok(config)
}
