use tracing::{info, warn};

use crate::app::android::parse::{parse_emu_avd_name, running_emulator_serials};
use crate::app::error::AppError;
use crate::app::host::runner::{Dispatch, ToolRunner};
use crate::app::host::toolchain::Toolchain;

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}

/// Starts `emulator -avd <name>`. The emulator process lives as long as the device,
/// so this only waits for the spawn.
pub fn boot_emulator(
    toolchain: &Toolchain,
    runner: &dyn ToolRunner,
    avd_name: &str,
    trace_id: &str,
) -> Result<Dispatch, AppError> {
    let emulator = toolchain.require_emulator(trace_id)?;
    runner.spawn_detached(emulator, &to_args(&["-avd", avd_name]), trace_id)?;
    info!(trace_id = %trace_id, avd = %avd_name, "emulator start dispatched");
    Ok(Dispatch::Spawned)
}

/// Finds the `emulator-NNNN` serial currently running `avd_name` by asking each console.
pub fn resolve_emulator_serial(
    adb: &str,
    runner: &dyn ToolRunner,
    avd_name: &str,
    trace_id: &str,
) -> Result<Option<String>, AppError> {
    let output = runner
        .run(adb, &to_args(&["devices"]), trace_id)?
        .into_success("adb devices", trace_id)?;
    for serial in running_emulator_serials(&output.stdout) {
        let reported = match runner.run(adb, &to_args(&["-s", &serial, "emu", "avd", "name"]), trace_id) {
            Ok(output) if output.success() => parse_emu_avd_name(&output.stdout),
            Ok(_) | Err(_) => None,
        };
        if reported.as_deref() == Some(avd_name) {
            return Ok(Some(serial));
        }
    }
    Ok(None)
}

pub fn shutdown_emulator(
    toolchain: &Toolchain,
    runner: &dyn ToolRunner,
    avd_name: &str,
    trace_id: &str,
) -> Result<Dispatch, AppError> {
    let adb = toolchain.require_adb(trace_id)?;
    let serial = resolve_emulator_serial(adb, runner, avd_name, trace_id)?.ok_or_else(|| {
        AppError::tool_invocation(format!("No running emulator found for AVD {avd_name}"), trace_id)
    })?;
    let output = runner
        .run(adb, &to_args(&["-s", &serial, "emu", "kill"]), trace_id)?
        .into_success("adb emu kill", trace_id)?;
    info!(trace_id = %trace_id, avd = %avd_name, serial = %serial, "emulator stop requested");
    Ok(Dispatch::Completed(output))
}

/// Wakes the running instance's display, or starts the AVD when no instance is found.
/// Failures past the tool check are logged and swallowed; there is no completion guarantee.
pub fn open_emulator(
    toolchain: &Toolchain,
    runner: &dyn ToolRunner,
    avd_name: &str,
    trace_id: &str,
) -> Result<Dispatch, AppError> {
    if toolchain.adb.is_none() && toolchain.emulator.is_none() {
        return Err(AppError::tool_not_found(
            "Neither adb nor the Android emulator executable was found",
            trace_id,
        ));
    }

    let serial = match toolchain.adb.as_deref() {
        Some(adb) => resolve_emulator_serial(adb, runner, avd_name, trace_id).unwrap_or_else(|err| {
            warn!(trace_id = %trace_id, error = %err, "failed to resolve emulator serial");
            None
        }),
        None => None,
    };

    let dispatched = match (serial, toolchain.adb.as_deref(), toolchain.emulator.as_deref()) {
        (Some(serial), Some(adb), _) => runner.spawn_detached(
            adb,
            &to_args(&["-s", &serial, "shell", "input", "keyevent", "KEYCODE_WAKEUP"]),
            trace_id,
        ),
        (_, _, Some(emulator)) => {
            runner.spawn_detached(emulator, &to_args(&["-avd", avd_name]), trace_id)
        }
        _ => Err(AppError::tool_not_found(
            "Android emulator executable not found",
            trace_id,
        )),
    };
    if let Err(err) = dispatched {
        warn!(trace_id = %trace_id, avd = %avd_name, error = %err, "open emulator failed");
    }
    Ok(Dispatch::Spawned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::host::fake::FakeRunner;

    fn toolchain() -> Toolchain {
        Toolchain {
            emulator: Some("emulator".to_string()),
            adb: Some("adb".to_string()),
            ..Toolchain::default()
        }
    }

    fn two_running(runner: &FakeRunner) {
        runner.respond_ok(
            "adb devices",
            "List of devices attached\nemulator-5554\tdevice\nemulator-5556\tdevice\n",
        );
        runner.respond_ok("adb -s emulator-5554 emu avd name", "Pixel_7\r\nOK\r\n");
        runner.respond_ok("adb -s emulator-5556 emu avd name", "Tablet\r\nOK\r\n");
    }

    #[test]
    fn boot_spawns_emulator_detached() {
        let runner = FakeRunner::new();
        let dispatch = boot_emulator(&toolchain(), &runner, "Pixel_7", "t").expect("boot");
        assert_eq!(dispatch, Dispatch::Spawned);
        let calls = runner.calls();
        assert_eq!(calls[0].command_line, "emulator -avd Pixel_7");
        assert!(calls[0].detached);
    }

    #[test]
    fn boot_without_emulator_is_tool_not_found() {
        let runner = FakeRunner::new();
        let toolchain = Toolchain {
            adb: Some("adb".to_string()),
            ..Toolchain::default()
        };
        let err = boot_emulator(&toolchain, &runner, "Pixel_7", "t").unwrap_err();
        assert!(err.is_tool_not_found());
    }

    #[test]
    fn boot_spawn_failure_is_reported() {
        let runner = FakeRunner::new();
        runner.fail_spawn("emulator");
        let err = boot_emulator(&toolchain(), &runner, "Pixel_7", "t").unwrap_err();
        assert_eq!(err.code, "ERR_TOOL_INVOCATION");
    }

    #[test]
    fn shutdown_kills_the_matching_instance() {
        let runner = FakeRunner::new();
        two_running(&runner);
        runner.respond_ok("adb -s emulator-5556 emu kill", "OK: killing emulator, bye bye\n");
        let dispatch = shutdown_emulator(&toolchain(), &runner, "Tablet", "t").expect("shutdown");
        assert!(matches!(dispatch, Dispatch::Completed(_)));
        assert_eq!(runner.count("adb -s emulator-5556 emu kill"), 1);
        assert_eq!(runner.count("adb -s emulator-5554 emu kill"), 0);
    }

    #[test]
    fn shutdown_without_running_instance_fails() {
        let runner = FakeRunner::new();
        two_running(&runner);
        let err = shutdown_emulator(&toolchain(), &runner, "Wear_OS", "t").unwrap_err();
        assert_eq!(err.code, "ERR_TOOL_INVOCATION");
        assert!(err.error.contains("Wear_OS"));
    }

    #[test]
    fn open_wakes_running_instance() {
        let runner = FakeRunner::new();
        two_running(&runner);
        open_emulator(&toolchain(), &runner, "Pixel_7", "t").expect("open");
        assert_eq!(
            runner.count("adb -s emulator-5554 shell input keyevent KEYCODE_WAKEUP"),
            1
        );
    }

    #[test]
    fn open_starts_avd_when_not_running() {
        let runner = FakeRunner::new();
        runner.respond_ok("adb devices", "List of devices attached\n");
        open_emulator(&toolchain(), &runner, "Pixel_7", "t").expect("open");
        assert_eq!(runner.count("emulator -avd Pixel_7"), 1);
    }

    #[test]
    fn open_failures_are_swallowed() {
        let runner = FakeRunner::new();
        runner.respond_exit("adb devices", 1, "daemon not running");
        runner.fail_spawn("emulator");
        let dispatch = open_emulator(&toolchain(), &runner, "Pixel_7", "t").expect("open");
        assert_eq!(dispatch, Dispatch::Spawned);
    }
}
