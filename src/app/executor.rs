use std::sync::Arc;

use tracing::{info, warn};

use crate::app::android::control::{boot_emulator, open_emulator, shutdown_emulator};
use crate::app::error::AppError;
use crate::app::host::runner::{CommandOutput, Dispatch, ToolRunner};
use crate::app::host::toolchain::Toolchain;
use crate::app::ios::control::{boot_simulator, open_simulator, shutdown_simulator};
use crate::app::models::{CommandOutcome, DeviceAction, DeviceCategory};
use crate::app::poller::RefreshTrigger;

/// Trigger for one-shot front ends that have no poller to refresh.
pub struct NoRefresh;

impl RefreshTrigger for NoRefresh {
    fn request_refresh(&self) {}
}

/// Runs lifecycle commands against one device and nudges the poller afterwards.
/// Live state is not consulted: booting a booted simulator is left to the vendor tool to reject.
pub struct CommandExecutor {
    toolchain: Toolchain,
    runner: Arc<dyn ToolRunner>,
    trigger: Arc<dyn RefreshTrigger>,
}

impl CommandExecutor {
    pub fn new(
        toolchain: Toolchain,
        runner: Arc<dyn ToolRunner>,
        trigger: Arc<dyn RefreshTrigger>,
    ) -> Self {
        Self {
            toolchain,
            runner,
            trigger,
        }
    }

    pub fn execute(
        &self,
        category: DeviceCategory,
        action: DeviceAction,
        device_id: &str,
        trace_id: &str,
    ) -> Result<CommandOutcome, AppError> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(AppError::validation("device_id is required", trace_id));
        }

        info!(
            trace_id = %trace_id,
            category = %category,
            action = action.as_str(),
            device_id = %device_id,
            "executing device command"
        );
        let result = self.dispatch(category, action, device_id, trace_id);
        self.trigger.request_refresh();

        match result {
            Ok(Dispatch::Completed(output)) => Ok(outcome(category, action, device_id, false, output)),
            Ok(Dispatch::Spawned) => Ok(outcome(
                category,
                action,
                device_id,
                true,
                CommandOutput::default(),
            )),
            Err(err) => {
                warn!(
                    trace_id = %trace_id,
                    action = action.as_str(),
                    device_id = %device_id,
                    error = %err,
                    "device command failed"
                );
                Err(err)
            }
        }
    }

    fn dispatch(
        &self,
        category: DeviceCategory,
        action: DeviceAction,
        device_id: &str,
        trace_id: &str,
    ) -> Result<Dispatch, AppError> {
        let toolchain = &self.toolchain;
        let runner = self.runner.as_ref();
        match (category, action) {
            (DeviceCategory::Ios, DeviceAction::Boot) => {
                boot_simulator(toolchain, runner, device_id, trace_id)
            }
            (DeviceCategory::Ios, DeviceAction::Shutdown) => {
                shutdown_simulator(toolchain, runner, device_id, trace_id)
            }
            (DeviceCategory::Ios, DeviceAction::Open) => {
                open_simulator(toolchain, runner, device_id, trace_id)
            }
            (DeviceCategory::Android, DeviceAction::Boot) => {
                boot_emulator(toolchain, runner, device_id, trace_id)
            }
            (DeviceCategory::Android, DeviceAction::Shutdown) => {
                shutdown_emulator(toolchain, runner, device_id, trace_id)
            }
            (DeviceCategory::Android, DeviceAction::Open) => {
                open_emulator(toolchain, runner, device_id, trace_id)
            }
        }
    }
}

fn outcome(
    category: DeviceCategory,
    action: DeviceAction,
    device_id: &str,
    dispatched: bool,
    output: CommandOutput,
) -> CommandOutcome {
    CommandOutcome {
        category,
        action,
        device_id: device_id.to_string(),
        dispatched,
        stdout: output.stdout,
        stderr: output.stderr,
        exit_code: output.exit_code,
    }
}
