use std::collections::HashMap;

use crate::app::classify::{api_level_from_avd_name, api_level_from_sysdir, api_level_from_target};

/// One row of `adb devices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbDeviceEntry {
    pub serial: String,
    pub state: String,
}

impl AdbDeviceEntry {
    pub fn is_running_emulator(&self) -> bool {
        self.serial.contains("emulator-") && self.state == "device"
    }
}

pub fn parse_adb_devices(output: &str) -> Vec<AdbDeviceEntry> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.trim_start().starts_with('*'))
        .filter(|line| !line.to_lowercase().contains("list of devices"))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let serial = tokens.next()?.to_string();
            let state = tokens.next()?.to_string();
            Some(AdbDeviceEntry { serial, state })
        })
        .collect()
}

/// Serials of emulator instances that adb reports as online.
pub fn running_emulator_serials(output: &str) -> Vec<String> {
    parse_adb_devices(output)
        .into_iter()
        .filter(AdbDeviceEntry::is_running_emulator)
        .map(|entry| entry.serial)
        .collect()
}

/// `emulator -list-avds` prints one AVD per line, sometimes mixed with emulator log lines.
pub fn parse_avd_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .filter(|line| {
            !(line.starts_with("INFO")
                || line.starts_with("WARNING")
                || line.starts_with("ERROR")
                || line.starts_with('|'))
        })
        .map(|line| line.to_string())
        .collect()
}

/// `adb -s emulator-5554 emu avd name` answers with the AVD name followed by `OK`.
pub fn parse_emu_avd_name(output: &str) -> Option<String> {
    output
        .lines()
        .map(|line| line.trim())
        .find(|line| !line.is_empty() && *line != "OK")
        .map(|line| line.to_string())
}

/// Key/value pairs from an AVD `config.ini`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvdConfig {
    values: HashMap<String, String>,
}

impl AvdConfig {
    pub fn parse(content: &str) -> Self {
        let mut values = HashMap::new();
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if !key.is_empty() {
                values.insert(key.to_string(), value.trim().to_string());
            }
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn hw_device_name(&self) -> Option<&str> {
        self.get("hw.device.name")
    }

    /// System image path first, then `target`, then a token in the AVD name.
    pub fn api_level(&self, avd_name: &str) -> Option<u32> {
        self.get("image.sysdir.1")
            .and_then(api_level_from_sysdir)
            .or_else(|| self.get("target").and_then(api_level_from_target))
            .or_else(|| api_level_from_avd_name(avd_name))
    }
}
