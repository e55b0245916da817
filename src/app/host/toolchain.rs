use std::path::Path;

use crate::app::error::AppError;
use crate::app::host::locator::ToolLocator;
use crate::app::models::ToolInfo;

/// Executable paths resolved for one discovery cycle or command. `None` means "not installed".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toolchain {
    pub xcrun: Option<String>,
    pub open: Option<String>,
    pub emulator: Option<String>,
    pub adb: Option<String>,
}

impl Toolchain {
    pub fn resolve(locator: &ToolLocator) -> Self {
        Self {
            xcrun: locator.locate_host_tool("xcrun").map(display_path),
            open: locator.locate_host_tool("open").map(display_path),
            emulator: locator.locate("emulator").map(display_path),
            adb: locator.locate("adb").map(display_path),
        }
    }

    pub fn require_xcrun(&self, trace_id: &str) -> Result<&str, AppError> {
        require(self.xcrun.as_deref(), "xcrun (Xcode command line tools)", trace_id)
    }

    pub fn require_open(&self, trace_id: &str) -> Result<&str, AppError> {
        require(self.open.as_deref(), "open", trace_id)
    }

    pub fn require_emulator(&self, trace_id: &str) -> Result<&str, AppError> {
        require(self.emulator.as_deref(), "Android emulator", trace_id)
    }

    pub fn require_adb(&self, trace_id: &str) -> Result<&str, AppError> {
        require(self.adb.as_deref(), "adb", trace_id)
    }
}

fn require<'a>(path: Option<&'a str>, name: &str, trace_id: &str) -> Result<&'a str, AppError> {
    path.ok_or_else(|| AppError::tool_not_found(format!("{name} executable not found"), trace_id))
}

fn display_path(path: impl AsRef<Path>) -> String {
    path.as_ref().to_string_lossy().to_string()
}

/// Availability of every tool with the locations that were probed, for diagnostics.
pub fn tool_report(locator: &ToolLocator) -> Vec<ToolInfo> {
    let mut report = Vec::new();
    for name in ["xcrun", "open"] {
        let found = locator.locate_host_tool(name);
        report.push(ToolInfo {
            name: name.to_string(),
            available: found.is_some(),
            command_path: found.map(display_path),
            searched: vec!["PATH".to_string(), "/usr/bin".to_string()],
        });
    }
    for name in ["emulator", "adb"] {
        let found = locator.locate(name);
        report.push(ToolInfo {
            name: name.to_string(),
            available: found.is_some(),
            command_path: found.map(display_path),
            searched: locator.candidates(name).into_iter().map(display_path).collect(),
        });
    }
    report
}
