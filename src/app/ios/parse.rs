use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::debug;

use crate::app::classify::{classify_simulator, simulator_os_label};
use crate::app::error::AppError;
use crate::app::models::{Device, DeviceCategory, DeviceStatus};

#[derive(Debug, Deserialize)]
struct SimctlList {
    devices: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimctlDevice {
    udid: String,
    name: String,
    state: String,
    device_type_identifier: Option<String>,
}

/// Parses `simctl list devices --json`.
///
/// Only a payload that is not JSON, or has no `devices` map, is an error. Individual
/// runtimes or descriptors that do not have the expected shape are skipped.
pub fn parse_simctl_devices(output: &str, trace_id: &str) -> Result<Vec<Device>, AppError> {
    let list: SimctlList = serde_json::from_str(output).map_err(|err| {
        AppError::parse(format!("Invalid simctl device list: {err}"), trace_id)
    })?;

    let mut devices = Vec::new();
    for (runtime, entries) in &list.devices {
        let Some(entries) = entries.as_array() else {
            debug!(trace_id = %trace_id, runtime = %runtime, "skipping runtime without device array");
            continue;
        };
        let os_label = simulator_os_label(runtime);
        for entry in entries {
            let raw = match SimctlDevice::deserialize(entry) {
                Ok(raw) => raw,
                Err(err) => {
                    debug!(
                        trace_id = %trace_id,
                        runtime = %runtime,
                        error = %err,
                        "skipping malformed simulator entry"
                    );
                    continue;
                }
            };
            if raw.udid.trim().is_empty() {
                continue;
            }
            let (family, family_label) = classify_simulator(&raw.name);
            devices.push(Device {
                id: raw.udid,
                name: raw.name,
                category: DeviceCategory::Ios,
                family,
                family_label,
                os_label: os_label.clone(),
                status: DeviceStatus::from_simctl_state(&raw.state),
                device_type: raw
                    .device_type_identifier
                    .filter(|value| !value.trim().is_empty()),
            });
        }
    }
    Ok(devices)
}
