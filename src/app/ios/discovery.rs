use tracing::debug;

use crate::app::error::AppError;
use crate::app::host::runner::ToolRunner;
use crate::app::host::toolchain::Toolchain;
use crate::app::ios::parse::parse_simctl_devices;
use crate::app::models::Device;

pub fn simctl_list_args() -> Vec<String> {
    ["simctl", "list", "devices", "--json"]
        .iter()
        .map(|arg| arg.to_string())
        .collect()
}

/// Lists every simulator. Fails when xcrun is missing, exits nonzero, or prints
/// something that is not a device list; bad individual entries are skipped.
pub fn discover_ios(
    toolchain: &Toolchain,
    runner: &dyn ToolRunner,
    trace_id: &str,
) -> Result<Vec<Device>, AppError> {
    let xcrun = toolchain.require_xcrun(trace_id)?;
    let output = runner
        .run(xcrun, &simctl_list_args(), trace_id)?
        .into_success("simctl list devices", trace_id)?;
    let devices = parse_simctl_devices(&output.stdout, trace_id)?;
    debug!(trace_id = %trace_id, count = devices.len(), "discovered simulators");
    Ok(devices)
}
