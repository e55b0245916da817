use tracing::{info, warn};

use crate::app::error::AppError;
use crate::app::host::runner::{Dispatch, ToolRunner};
use crate::app::host::toolchain::Toolchain;

fn simctl_args(verb: &str, udid: &str) -> Vec<String> {
    vec!["simctl".to_string(), verb.to_string(), udid.to_string()]
}

fn open_simulator_args(udid: &str) -> Vec<String> {
    vec![
        "-a".to_string(),
        "Simulator".to_string(),
        "--args".to_string(),
        "-CurrentDeviceUDID".to_string(),
        udid.to_string(),
    ]
}

/// `simctl boot`, then brings Simulator.app forward on the booted device.
/// The follow-up window focus is best effort and never fails the boot.
pub fn boot_simulator(
    toolchain: &Toolchain,
    runner: &dyn ToolRunner,
    udid: &str,
    trace_id: &str,
) -> Result<Dispatch, AppError> {
    let xcrun = toolchain.require_xcrun(trace_id)?;
    let output = runner
        .run(xcrun, &simctl_args("boot", udid), trace_id)?
        .into_success("simctl boot", trace_id)?;
    info!(trace_id = %trace_id, udid = %udid, "simulator booted");

    if let Err(err) = open_simulator(toolchain, runner, udid, trace_id) {
        warn!(trace_id = %trace_id, udid = %udid, error = %err, "failed to open Simulator after boot");
    }
    Ok(Dispatch::Completed(output))
}

pub fn shutdown_simulator(
    toolchain: &Toolchain,
    runner: &dyn ToolRunner,
    udid: &str,
    trace_id: &str,
) -> Result<Dispatch, AppError> {
    let xcrun = toolchain.require_xcrun(trace_id)?;
    let output = runner
        .run(xcrun, &simctl_args("shutdown", udid), trace_id)?
        .into_success("simctl shutdown", trace_id)?;
    info!(trace_id = %trace_id, udid = %udid, "simulator shut down");
    Ok(Dispatch::Completed(output))
}

/// Focuses Simulator.app on `udid`. Returns as soon as `open` has been spawned.
pub fn open_simulator(
    toolchain: &Toolchain,
    runner: &dyn ToolRunner,
    udid: &str,
    trace_id: &str,
) -> Result<Dispatch, AppError> {
    let open = toolchain.require_open(trace_id)?;
    runner.spawn_detached(open, &open_simulator_args(udid), trace_id)?;
    Ok(Dispatch::Spawned)
}
