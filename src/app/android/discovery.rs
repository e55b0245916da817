use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::app::android::parse::{parse_avd_list, running_emulator_serials, AvdConfig};
use crate::app::classify::{android_version_label, classify_avd_hardware, UNKNOWN_OS_LABEL};
use crate::app::host::runner::ToolRunner;
use crate::app::host::toolchain::Toolchain;
use crate::app::models::{Device, DeviceCategory, DeviceStatus};

/// `$ANDROID_AVD_HOME`, else `~/.android/avd`.
pub fn default_avd_home() -> PathBuf {
    if let Some(path) = std::env::var_os("ANDROID_AVD_HOME").filter(|value| !value.is_empty()) {
        return PathBuf::from(path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".android")
        .join("avd")
}

pub fn avd_config_path(avd_home: &Path, avd_name: &str) -> PathBuf {
    avd_home.join(format!("{avd_name}.avd")).join("config.ini")
}

/// Lists configured AVDs. Never fails: missing tooling or unreadable output yields an empty
/// list, and a bad `config.ini` only degrades that one device.
///
/// Boot state is coarse. Every AVD is reported `Booted` as soon as adb shows any running
/// emulator instance, because `adb devices` does not say which AVD an `emulator-NNNN`
/// serial belongs to.
pub fn discover_android(
    toolchain: &Toolchain,
    runner: &dyn ToolRunner,
    avd_home: &Path,
    trace_id: &str,
) -> Vec<Device> {
    let Some(emulator) = toolchain.emulator.as_deref() else {
        warn!(trace_id = %trace_id, "Android emulator executable not found");
        return Vec::new();
    };

    let avd_names = match runner.run(emulator, &["-list-avds".to_string()], trace_id) {
        Ok(output) if output.success() => parse_avd_list(&output.stdout),
        Ok(output) => {
            warn!(
                trace_id = %trace_id,
                exit_code = ?output.exit_code,
                stderr = %output.stderr.trim(),
                "emulator -list-avds failed"
            );
            return Vec::new();
        }
        Err(err) => {
            warn!(trace_id = %trace_id, error = %err, "emulator -list-avds failed");
            return Vec::new();
        }
    };
    if avd_names.is_empty() {
        debug!(trace_id = %trace_id, "no Android virtual devices configured");
        return Vec::new();
    }

    let running = probe_running_emulators(toolchain, runner, trace_id);
    let any_running = !running.is_empty();

    avd_names
        .iter()
        .map(|name| {
            let config = read_avd_config(&avd_config_path(avd_home, name), trace_id);
            build_avd_device(name, config.as_ref(), any_running)
        })
        .collect()
}

fn probe_running_emulators(
    toolchain: &Toolchain,
    runner: &dyn ToolRunner,
    trace_id: &str,
) -> Vec<String> {
    let Some(adb) = toolchain.adb.as_deref() else {
        warn!(trace_id = %trace_id, "adb not found, cannot determine running emulators");
        return Vec::new();
    };
    match runner.run(adb, &["devices".to_string()], trace_id) {
        Ok(output) if output.success() => running_emulator_serials(&output.stdout),
        Ok(output) => {
            warn!(trace_id = %trace_id, exit_code = ?output.exit_code, "adb devices failed");
            Vec::new()
        }
        Err(err) => {
            warn!(trace_id = %trace_id, error = %err, "adb devices failed");
            Vec::new()
        }
    }
}

fn read_avd_config(path: &Path, trace_id: &str) -> Option<AvdConfig> {
    match fs::read_to_string(path) {
        Ok(content) => Some(AvdConfig::parse(&content)),
        Err(err) => {
            debug!(
                trace_id = %trace_id,
                path = %path.display(),
                error = %err,
                "AVD config unavailable"
            );
            None
        }
    }
}

pub fn build_avd_device(name: &str, config: Option<&AvdConfig>, any_running: bool) -> Device {
    let (family, family_label) = classify_avd_hardware(config.and_then(AvdConfig::hw_device_name));
    let os_label = config
        .and_then(|config| config.api_level(name))
        .map(android_version_label)
        .unwrap_or_else(|| UNKNOWN_OS_LABEL.to_string());
    Device {
        id: name.to_string(),
        name: name.to_string(),
        category: DeviceCategory::Android,
        family,
        family_label,
        os_label,
        status: if any_running {
            DeviceStatus::Booted
        } else {
            DeviceStatus::Shutdown
        },
        device_type: None,
    }
}
