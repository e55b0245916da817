use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use uuid::Uuid;

use crate::app::android::discovery::default_avd_home;
use crate::app::config::{AppConfig, DeviceSettings};
use crate::app::error::AppError;
use crate::app::executor::{CommandExecutor, NoRefresh};
use crate::app::host::locator::ToolLocator;
use crate::app::host::runner::{SystemRunner, ToolRunner};
use crate::app::host::toolchain::{tool_report, Toolchain};
use crate::app::models::{
    CategoryPreference, CommandOutcome, CommandResponse, Device, DeviceAction, DeviceCategory,
    DeviceGroup, DeviceSnapshot, ToolInfo,
};
use crate::app::poller::{Discovery, PollPhase, Poller};
use crate::app::unify::{filter_devices, group_devices};

/// Entry point for front ends: owns the poller and the command executor.
pub struct DeviceManager {
    locator: ToolLocator,
    poller: Arc<Poller>,
    executor: CommandExecutor,
}

impl DeviceManager {
    /// Resolves tools from the environment and starts polling.
    pub fn start(config: &AppConfig) -> Self {
        let (locator, toolchain, runner) = resolve_host(config);
        Self::from_parts(
            config.device.clone(),
            locator,
            toolchain,
            runner,
            default_avd_home(),
        )
    }

    pub fn from_parts(
        settings: DeviceSettings,
        locator: ToolLocator,
        toolchain: Toolchain,
        runner: Arc<dyn ToolRunner>,
        avd_home: PathBuf,
    ) -> Self {
        let interval = Duration::from_millis(settings.refresh_interval_ms);
        let discovery = Discovery::new(
            toolchain.clone(),
            Arc::clone(&runner),
            avd_home,
            settings,
        );
        let poller = Arc::new(Poller::start(Arc::new(discovery), interval));
        let executor = CommandExecutor::new(toolchain, runner, poller.clone());
        Self {
            locator,
            poller,
            executor,
        }
    }

    pub fn snapshot(&self, trace_id: Option<String>) -> CommandResponse<DeviceSnapshot> {
        CommandResponse {
            trace_id: resolve_trace_id(trace_id),
            data: self.poller.snapshot().as_ref().clone(),
        }
    }

    pub fn devices(
        &self,
        search: &str,
        category: CategoryPreference,
        trace_id: Option<String>,
    ) -> CommandResponse<Vec<Device>> {
        let snapshot = self.poller.snapshot();
        CommandResponse {
            trace_id: resolve_trace_id(trace_id),
            data: filter_devices(&snapshot.devices, search, category),
        }
    }

    pub fn groups(
        &self,
        search: &str,
        category: CategoryPreference,
        trace_id: Option<String>,
    ) -> CommandResponse<Vec<DeviceGroup>> {
        let snapshot = self.poller.snapshot();
        let devices = filter_devices(&snapshot.devices, search, category);
        CommandResponse {
            trace_id: resolve_trace_id(trace_id),
            data: group_devices(&devices),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.poller.is_refreshing()
    }

    pub fn phase(&self) -> PollPhase {
        self.poller.phase()
    }

    pub fn refresh(
        &self,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<DeviceSnapshot>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        let snapshot = self.poller.refresh(&trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: snapshot.as_ref().clone(),
        })
    }

    pub fn execute(
        &self,
        category: DeviceCategory,
        action: DeviceAction,
        device_id: &str,
        trace_id: Option<String>,
    ) -> Result<CommandResponse<CommandOutcome>, AppError> {
        let trace_id = resolve_trace_id(trace_id);
        let outcome = self
            .executor
            .execute(category, action, device_id, &trace_id)?;
        Ok(CommandResponse {
            trace_id,
            data: outcome,
        })
    }

    pub fn tool_report(&self, trace_id: Option<String>) -> CommandResponse<Vec<ToolInfo>> {
        CommandResponse {
            trace_id: resolve_trace_id(trace_id),
            data: tool_report(&self.locator),
        }
    }

    pub fn stop(&self) {
        self.poller.stop();
    }
}

/// Runs a single device command without starting the poller.
pub fn execute_once(
    config: &AppConfig,
    category: DeviceCategory,
    action: DeviceAction,
    device_id: &str,
    trace_id: Option<String>,
) -> Result<CommandResponse<CommandOutcome>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let (_, toolchain, runner) = resolve_host(config);
    let executor = CommandExecutor::new(toolchain, runner, Arc::new(NoRefresh));
    let outcome = executor.execute(category, action, device_id, &trace_id)?;
    Ok(CommandResponse {
        trace_id,
        data: outcome,
    })
}

/// Tool availability without starting the poller.
pub fn tool_report_once(
    config: &AppConfig,
    trace_id: Option<String>,
) -> CommandResponse<Vec<ToolInfo>> {
    CommandResponse {
        trace_id: resolve_trace_id(trace_id),
        data: tool_report(&ToolLocator::from_env(&config.tools.android_sdk_path)),
    }
}

fn resolve_host(config: &AppConfig) -> (ToolLocator, Toolchain, Arc<dyn ToolRunner>) {
    let locator = ToolLocator::from_env(&config.tools.android_sdk_path);
    let toolchain = Toolchain::resolve(&locator);
    info!(
        xcrun = ?toolchain.xcrun,
        emulator = ?toolchain.emulator,
        adb = ?toolchain.adb,
        "resolved toolchain"
    );
    let runner: Arc<dyn ToolRunner> = Arc::new(SystemRunner::new(Duration::from_secs(
        config.tools.command_timeout_secs,
    )));
    (locator, toolchain, runner)
}

fn resolve_trace_id(input: Option<String>) -> String {
    input
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::host::fake::FakeRunner;
    use crate::app::models::DeviceStatus;
    use crate::app::unify::ids_are_disjoint;
    use std::collections::HashSet;

    const SIMCTL: &str = r#"{
      "devices": {
        "com.apple.CoreSimulator.SimRuntime.iOS-17-0": [
          {"udid": "A-1", "name": "iPhone 15", "state": "Booted", "isAvailable": true},
          {"udid": "A-2", "name": "iPad Air", "state": "Shutdown", "isAvailable": true}
        ]
      }
    }"#;

    fn manager(runner: Arc<FakeRunner>, avd_home: PathBuf) -> DeviceManager {
        let toolchain = Toolchain {
            xcrun: Some("xcrun".to_string()),
            open: Some("open".to_string()),
            emulator: Some("emulator".to_string()),
            adb: Some("adb".to_string()),
        };
        DeviceManager::from_parts(
            DeviceSettings {
                refresh_interval_ms: 60_000,
                ios_enabled: true,
                android_enabled: true,
                ..DeviceSettings::default()
            },
            ToolLocator::with_roots(Vec::new(), Vec::new(), None),
            toolchain,
            runner,
            avd_home,
        )
    }

    fn scripted_runner() -> Arc<FakeRunner> {
        let runner = Arc::new(FakeRunner::new());
        runner.respond_ok("xcrun simctl list devices --json", SIMCTL);
        runner.respond_ok("emulator -list-avds", "Pixel_7_API_34\n");
        runner.respond_ok("adb devices", "List of devices attached\n");
        runner
    }

    #[test]
    fn refresh_unifies_both_platforms() {
        let dir = tempfile::tempdir().expect("tempdir");
        let avd_dir = dir.path().join("Pixel_7_API_34.avd");
        std::fs::create_dir_all(&avd_dir).expect("mkdir");
        std::fs::write(avd_dir.join("config.ini"), "hw.device.name=pixel_7\ntarget=android-34\n")
            .expect("write");
        let manager = manager(scripted_runner(), dir.path().to_path_buf());

        let response = manager.refresh(Some("trace-1".to_string())).expect("refresh");
        assert_eq!(response.trace_id, "trace-1");
        let snapshot = response.data;
        assert!(snapshot.generation >= 1);
        assert_eq!(snapshot.devices.len(), 3);
        assert_eq!(snapshot.devices[0].status, DeviceStatus::Booted);
        assert_eq!(snapshot.devices[2].id, "Pixel_7_API_34");
        assert_eq!(snapshot.devices[2].os_label, "Android 14.0");
        assert_eq!(manager.phase(), PollPhase::Ready);
        assert!(!manager.is_refreshing());
        manager.stop();
    }

    #[test]
    fn repeated_refresh_yields_set_equal_snapshots() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(scripted_runner(), dir.path().to_path_buf());

        let first = manager.refresh(None).expect("first").data;
        let second = manager.refresh(None).expect("second").data;
        assert!(second.generation > first.generation);
        assert!(ids_are_disjoint(&second.devices));
        let as_set = |snapshot: &DeviceSnapshot| snapshot.devices.iter().cloned().collect::<HashSet<_>>();
        assert_eq!(as_set(&first), as_set(&second));
    }

    #[test]
    fn devices_and_groups_apply_filters() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(scripted_runner(), dir.path().to_path_buf());
        manager.refresh(None).expect("refresh");

        let android = manager.devices("", CategoryPreference::Android, None);
        assert!(!android.trace_id.is_empty());
        assert_eq!(android.data.len(), 1);

        let ipad = manager.devices("air", CategoryPreference::All, None);
        assert_eq!(ipad.data[0].id, "A-2");

        let groups = manager.groups("", CategoryPreference::All, None).data;
        let titles = groups.iter().map(|group| group.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, vec!["iPhone", "iPad", "Android Phone"]);
    }

    #[test]
    fn execute_wraps_outcome_with_trace_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = scripted_runner();
        runner.respond_ok("xcrun simctl shutdown A-1", "");
        let manager = manager(runner.clone(), dir.path().to_path_buf());

        let response = manager
            .execute(DeviceCategory::Ios, DeviceAction::Shutdown, "A-1", None)
            .expect("shutdown");
        assert!(!response.trace_id.is_empty());
        assert_eq!(response.data.device_id, "A-1");
        assert_eq!(runner.count("xcrun simctl shutdown A-1"), 1);
    }

    #[test]
    fn tool_report_lists_every_tool() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(scripted_runner(), dir.path().to_path_buf());
        let report = manager.tool_report(None).data;
        let names = report.iter().map(|tool| tool.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["xcrun", "open", "emulator", "adb"]);
        assert!(!report[2].available);
    }

    #[test]
    fn one_shot_helpers_do_not_need_a_poller() {
        let config = AppConfig::default();
        let report = tool_report_once(&config, Some("trace-5".to_string()));
        assert_eq!(report.trace_id, "trace-5");
        assert_eq!(report.data.len(), 4);

        let err = execute_once(&config, DeviceCategory::Android, DeviceAction::Boot, " ", None)
            .unwrap_err();
        assert_eq!(err.code, "ERR_VALIDATION");
    }

    #[test]
    fn blank_trace_id_is_replaced() {
        assert_eq!(resolve_trace_id(Some("abc".to_string())), "abc");
        assert_eq!(resolve_trace_id(Some("  ".to_string())).len(), 36);
        assert_eq!(resolve_trace_id(None).len(), 36);
    }
}
