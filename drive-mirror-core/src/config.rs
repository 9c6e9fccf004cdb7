use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Static configuration for the Drive-to-local sync agent.
///
/// Loaded once at process start and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    pub sync_name: String,
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    pub folder_id: String,
    #[serde(default)]
    pub folder_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Local directory; relative paths resolve against the working directory.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_cron")]
    pub cron: String,
    /// Human-readable description of the cadence, only used for display.
    #[serde(default)]
    pub interval: String,
    #[serde(default)]
    pub timezone: String,
}

fn default_cron() -> String {
    "0 0 */3 * *".to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            interval: "every 3 days".to_string(),
            timezone: String::new(),
        }
    }
}

impl SyncConfig {
    /// Replace the source folder id when an override is present and non-empty.
    pub fn with_folder_override(mut self, folder_id: Option<String>) -> Self {
        if let Some(id) = folder_id.filter(|id| !id.trim().is_empty()) {
            info!(
                configured = %self.source.folder_id,
                override_id = %id,
                "Overriding source folder id"
            );
            self.source.folder_id = id;
        }
        self
    }

    /// Destination directory resolved against `base`.
    pub fn destination_under(&self, base: &Path) -> PathBuf {
        base.join(&self.destination.path)
    }

    pub fn trace_loaded(&self) {
        info!(
            sync_name = %self.sync_name,
            folder_id = %self.source.folder_id,
            destination = %self.destination.path.display(),
            cron = %self.schedule.cron,
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_json() {
        let raw = r#"{
            "syncName": "Weekly docs",
            "source": { "folderId": "abc123", "folderName": "Docs" },
            "destination": { "path": "drive_sync/docs" },
            "schedule": { "cron": "0 * * * *", "interval": "hourly", "timezone": "Europe/Rome" }
        }"#;
        let config: SyncConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.sync_name, "Weekly docs");
        assert_eq!(config.source.folder_id, "abc123");
        assert_eq!(config.source.folder_name, "Docs");
        assert_eq!(config.destination.path, PathBuf::from("drive_sync/docs"));
        assert_eq!(config.schedule.cron, "0 * * * *");
        assert_eq!(config.schedule.timezone, "Europe/Rome");
    }

    #[test]
    fn schedule_defaults_when_missing() {
        let raw = r#"{
            "syncName": "n",
            "source": { "folderId": "f" },
            "destination": { "path": "out" }
        }"#;
        let config: SyncConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.schedule.cron, "0 0 */3 * *");
        assert!(config.source.folder_name.is_empty());
    }

    #[test]
    fn empty_override_keeps_configured_folder() {
        let raw = r#"{"syncName":"n","source":{"folderId":"f"},"destination":{"path":"out"}}"#;
        let config: SyncConfig = serde_json::from_str(raw).unwrap();
        let same = config.clone().with_folder_override(Some("  ".into()));
        assert_eq!(same.source.folder_id, "f");
        let replaced = config.with_folder_override(Some("g".into()));
        assert_eq!(replaced.source.folder_id, "g");
    }
}
