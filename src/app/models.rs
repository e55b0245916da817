use serde::{Deserialize, Serialize};
use std::fmt;

use crate::app::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DeviceCategory {
    Ios,
    Android,
}

impl DeviceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceCategory::Ios => "ios",
            DeviceCategory::Android => "android",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "ios" => Some(DeviceCategory::Ios),
            "android" => Some(DeviceCategory::Android),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DeviceFamily {
    Phone,
    Tablet,
    Wearable,
    Tv,
    Desktop,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DeviceStatus {
    Booted,
    Shutdown,
    Unknown,
}

impl DeviceStatus {
    /// Maps a raw simctl state. Anything outside the two settled states is `Unknown`.
    pub fn from_simctl_state(raw: &str) -> Self {
        match raw.trim() {
            "Booted" => DeviceStatus::Booted,
            "Shutdown" => DeviceStatus::Shutdown,
            _ => DeviceStatus::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeviceStatus::Booted => "Booted",
            DeviceStatus::Shutdown => "Shutdown",
            DeviceStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub category: DeviceCategory,
    pub family: DeviceFamily,
    pub family_label: String,
    pub os_label: String,
    pub status: DeviceStatus,
    pub device_type: Option<String>,
}

/// Which categories the host wants listed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CategoryPreference {
    #[default]
    All,
    Ios,
    Android,
}

impl CategoryPreference {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "all" | "" => Some(CategoryPreference::All),
            "ios" => Some(CategoryPreference::Ios),
            "android" => Some(CategoryPreference::Android),
            _ => None,
        }
    }

    pub fn includes_ios(&self) -> bool {
        matches!(self, CategoryPreference::All | CategoryPreference::Ios)
    }

    pub fn includes_android(&self) -> bool {
        matches!(self, CategoryPreference::All | CategoryPreference::Android)
    }

    pub fn matches(&self, category: DeviceCategory) -> bool {
        match category {
            DeviceCategory::Ios => self.includes_ios(),
            DeviceCategory::Android => self.includes_android(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceAction {
    Boot,
    Shutdown,
    Open,
}

impl DeviceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceAction::Boot => "boot",
            DeviceAction::Shutdown => "shutdown",
            DeviceAction::Open => "open",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "boot" => Some(DeviceAction::Boot),
            "shutdown" => Some(DeviceAction::Shutdown),
            "open" => Some(DeviceAction::Open),
            _ => None,
        }
    }
}

/// One completed discovery cycle. Replaced wholesale, never patched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeviceSnapshot {
    pub generation: u64,
    pub devices: Vec<Device>,
    pub refreshed_at: Option<String>,
    pub last_error: Option<AppError>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceGroup {
    pub title: String,
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandOutcome {
    pub category: DeviceCategory,
    pub action: DeviceAction,
    pub device_id: String,
    /// Fire-and-forget dispatch: only the spawn is known to have succeeded.
    pub dispatched: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    pub command_path: Option<String>,
    pub searched: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResponse<T> {
    pub trace_id: String,
    pub data: T,
}
