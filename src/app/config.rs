use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::app::error::AppError;
use crate::app::models::CategoryPreference;

pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 5_000;
const MIN_REFRESH_INTERVAL_MS: u64 = 1_000;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceSettings {
    pub refresh_interval_ms: u64,
    pub device_types_to_display: CategoryPreference,
    /// Capability flag: simctl is expected to be usable on this host.
    pub ios_enabled: bool,
    /// Capability flag: Android SDK tooling should be probed.
    pub android_enabled: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            device_types_to_display: CategoryPreference::All,
            ios_enabled: cfg!(target_os = "macos"),
            android_enabled: true,
        }
    }
}

impl DeviceSettings {
    pub fn fetch_ios(&self) -> bool {
        self.ios_enabled && self.device_types_to_display.includes_ios()
    }

    pub fn fetch_android(&self) -> bool {
        self.android_enabled && self.device_types_to_display.includes_android()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolSettings {
    /// Explicit Android SDK root, searched before ANDROID_HOME.
    pub android_sdk_path: String,
    pub command_timeout_secs: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            android_sdk_path: String::new(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    pub log_level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("SIMDECK_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    home_dir().join(".simdeck_config.json")
}

pub fn backup_config_path() -> PathBuf {
    home_dir().join(".simdeck_config.backup.json")
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn load_config(trace_id: &str) -> Result<AppConfig, AppError> {
    load_config_from_path(&config_path(), trace_id)
}

pub fn save_config(config: &AppConfig, trace_id: &str) -> Result<(), AppError> {
    save_config_to_path(config, &config_path(), &backup_config_path(), trace_id)
}

pub fn load_config_from_path(path: &Path, trace_id: &str) -> Result<AppConfig, AppError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| AppError::system(format!("Failed to read config: {err}"), trace_id))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|err| AppError::parse(format!("Failed to parse config: {err}"), trace_id))?;
    let mut config: AppConfig = serde_json::from_value(value.clone()).unwrap_or_default();
    config = apply_legacy_overrides(config, &value);
    Ok(validate_config(config))
}

pub fn save_config_to_path(
    config: &AppConfig,
    path: &Path,
    backup_path: &Path,
    trace_id: &str,
) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            AppError::system(format!("Failed to create config directory: {err}"), trace_id)
        })?;
    }
    if path.exists() {
        if let Err(err) = fs::copy(path, backup_path) {
            warn!(
                trace_id = %trace_id,
                backup = %backup_path.display(),
                error = %err,
                "config backup failed, keeping existing file"
            );
            return Err(AppError::system(
                format!("Failed to back up config: {err}"),
                trace_id,
            ));
        }
    }
    let payload = serde_json::to_string_pretty(config)
        .map_err(|err| AppError::system(format!("Failed to serialize config: {err}"), trace_id))?;
    fs::write(path, payload)
        .map_err(|err| AppError::system(format!("Failed to write config: {err}"), trace_id))?;
    Ok(())
}

// Flat camelCase keys from older preference files.
fn apply_legacy_overrides(mut config: AppConfig, value: &serde_json::Value) -> AppConfig {
    if let Some(preference) = value
        .get("deviceTypesToDisplay")
        .and_then(|v| v.as_str())
        .and_then(CategoryPreference::parse)
    {
        config.device.device_types_to_display = preference;
    }
    if let Some(sdk_path) = value.get("androidSdkPath").and_then(|v| v.as_str()) {
        config.tools.android_sdk_path = sdk_path.to_string();
    }
    if let Some(interval) = value.get("refreshInterval").and_then(|v| v.as_u64()) {
        config.device.refresh_interval_ms = interval;
    }
    config
}

fn validate_config(mut config: AppConfig) -> AppConfig {
    if config.device.refresh_interval_ms < MIN_REFRESH_INTERVAL_MS {
        config.device.refresh_interval_ms = DEFAULT_REFRESH_INTERVAL_MS;
    }
    if config.tools.command_timeout_secs == 0 {
        config.tools.command_timeout_secs = DEFAULT_COMMAND_TIMEOUT_SECS;
    }
    config.tools.android_sdk_path = config.tools.android_sdk_path.trim().to_string();
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_legacy_values() {
        let value = serde_json::json!({
            "deviceTypesToDisplay": "android",
            "androidSdkPath": "/opt/android-sdk",
            "refreshInterval": 8000
        });
        let mut config: AppConfig = serde_json::from_value(value.clone()).unwrap_or_default();
        config = apply_legacy_overrides(config, &value);
        assert_eq!(
            config.device.device_types_to_display,
            CategoryPreference::Android
        );
        assert_eq!(config.tools.android_sdk_path, "/opt/android-sdk");
        assert_eq!(config.device.refresh_interval_ms, 8000);
    }

    #[test]
    fn clamps_invalid_values() {
        let mut config = AppConfig::default();
        config.device.refresh_interval_ms = 10;
        config.tools.command_timeout_secs = 0;
        config.tools.android_sdk_path = "  /sdk  ".to_string();
        let validated = validate_config(config);
        assert_eq!(validated.device.refresh_interval_ms, DEFAULT_REFRESH_INTERVAL_MS);
        assert_eq!(validated.tools.command_timeout_secs, DEFAULT_COMMAND_TIMEOUT_SECS);
        assert_eq!(validated.tools.android_sdk_path, "/sdk");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config =
            load_config_from_path(&dir.path().join("absent.json"), "trace").expect("load");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn save_then_load_keeps_backup_of_previous_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let backup = dir.path().join("config.backup.json");

        let mut first = AppConfig::default();
        first.device.android_enabled = false;
        save_config_to_path(&first, &path, &backup, "t").expect("save first");
        assert!(!backup.exists());

        let mut second = first.clone();
        second.device.device_types_to_display = CategoryPreference::Ios;
        save_config_to_path(&second, &path, &backup, "t").expect("save second");

        let loaded = load_config_from_path(&path, "t").expect("load");
        assert_eq!(loaded, second);
        let previous = load_config_from_path(&backup, "t").expect("load backup");
        assert_eq!(previous, first);
    }

    #[test]
    fn partial_sections_keep_their_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"device":{"android_enabled":false},"tools":{"android_sdk_path":"/opt/sdk","command_timeout_secs":10}}"#,
        )
        .expect("write");

        let config = load_config_from_path(&path, "t").expect("load");
        assert!(!config.device.android_enabled);
        assert_eq!(config.device.refresh_interval_ms, DEFAULT_REFRESH_INTERVAL_MS);
        assert_eq!(config.device.device_types_to_display, CategoryPreference::All);
        assert_eq!(config.tools.android_sdk_path, "/opt/sdk");
        assert_eq!(config.tools.command_timeout_secs, 10);
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn failed_backup_leaves_existing_file_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        // A directory at the backup location makes the copy fail.
        let backup = dir.path().join("config.backup.json");
        fs::create_dir_all(&backup).expect("mkdir");

        let first = AppConfig::default();
        save_config_to_path(&first, &path, &backup, "t").expect("save first");

        let mut second = first.clone();
        second.device.refresh_interval_ms = 9_000;
        let err = save_config_to_path(&second, &path, &backup, "trace-3").unwrap_err();
        assert_eq!(err.code, "ERR_SYSTEM");
        assert_eq!(err.trace_id, "trace-3");
        assert_eq!(load_config_from_path(&path, "t").expect("load"), first);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").expect("write");
        let err = load_config_from_path(&path, "trace-9").unwrap_err();
        assert_eq!(err.code, "ERR_PARSE");
        assert_eq!(err.trace_id, "trace-9");
    }

    #[test]
    fn category_preference_gates_fetching() {
        let mut settings = DeviceSettings {
            ios_enabled: true,
            android_enabled: true,
            ..DeviceSettings::default()
        };
        settings.device_types_to_display = CategoryPreference::Ios;
        assert!(settings.fetch_ios());
        assert!(!settings.fetch_android());
        settings.device_types_to_display = CategoryPreference::All;
        settings.android_enabled = false;
        assert!(settings.fetch_ios());
        assert!(!settings.fetch_android());
    }
}
