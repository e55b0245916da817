use std::path::{Path, PathBuf};

/// SDK subdirectories probed under every Android SDK root, in order.
const SDK_SUBDIRS: [&str; 4] = ["platform-tools", "emulator", "tools", "tools/bin"];

/// Per-user SDK roots relative to the home directory (macOS first, then Linux).
const HOME_SDK_ROOTS: [&str; 2] = ["Library/Android/sdk", "Android/Sdk"];

pub fn normalize_command_path(value: &str) -> String {
    let trimmed = value.trim();
    if let Some(inner) = trimmed
        .strip_prefix('"')
        .and_then(|candidate| candidate.strip_suffix('"'))
    {
        return inner.trim().to_string();
    }
    if let Some(inner) = trimmed
        .strip_prefix('\'')
        .and_then(|candidate| candidate.strip_suffix('\''))
    {
        return inner.trim().to_string();
    }
    trimmed.to_string()
}

/// Finds vendor executables without running them. Absence is `None`, never an error.
#[derive(Debug, Clone, Default)]
pub struct ToolLocator {
    sdk_roots: Vec<PathBuf>,
    system_dirs: Vec<PathBuf>,
    home: Option<PathBuf>,
    search_path: Vec<PathBuf>,
}

impl ToolLocator {
    /// Builds the search order from a configured SDK path, `ANDROID_HOME`/`ANDROID_SDK_ROOT`,
    /// `/usr/local/bin`, and the per-user default SDK locations.
    pub fn from_env(configured_sdk_path: &str) -> Self {
        let mut sdk_roots = Vec::new();
        let configured = normalize_command_path(configured_sdk_path);
        if !configured.is_empty() {
            sdk_roots.push(PathBuf::from(configured));
        }
        for var in ["ANDROID_HOME", "ANDROID_SDK_ROOT"] {
            if let Some(value) = std::env::var_os(var).filter(|value| !value.is_empty()) {
                sdk_roots.push(PathBuf::from(value));
            }
        }
        let search_path = std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default();
        Self {
            sdk_roots,
            system_dirs: vec![PathBuf::from("/usr/local/bin")],
            home: dirs::home_dir(),
            search_path,
        }
    }

    pub fn with_roots(
        sdk_roots: Vec<PathBuf>,
        system_dirs: Vec<PathBuf>,
        home: Option<PathBuf>,
    ) -> Self {
        Self {
            sdk_roots,
            system_dirs,
            home,
            search_path: Vec::new(),
        }
    }

    pub fn with_search_path(mut self, search_path: Vec<PathBuf>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Every path `locate` would probe for an Android SDK tool, in priority order.
    pub fn candidates(&self, tool: &str) -> Vec<PathBuf> {
        let file_name = executable_name(tool);
        let mut candidates = Vec::new();
        for root in &self.sdk_roots {
            push_sdk_candidates(&mut candidates, root, &file_name);
        }
        for dir in &self.system_dirs {
            candidates.push(dir.join(&file_name));
        }
        if let Some(home) = &self.home {
            for root in HOME_SDK_ROOTS {
                push_sdk_candidates(&mut candidates, &home.join(root), &file_name);
            }
        }
        candidates
    }

    pub fn locate(&self, tool: &str) -> Option<PathBuf> {
        self.candidates(tool).into_iter().find(|path| is_executable_file(path))
    }

    /// Looks up a host tool such as `xcrun` on `PATH`, then in `/usr/bin`.
    pub fn locate_host_tool(&self, tool: &str) -> Option<PathBuf> {
        let file_name = executable_name(tool);
        let mut dirs = self.search_path.clone();
        dirs.push(PathBuf::from("/usr/bin"));
        dirs.into_iter()
            .map(|dir| dir.join(&file_name))
            .find(|path| is_executable_file(path))
    }
}

fn push_sdk_candidates(candidates: &mut Vec<PathBuf>, root: &Path, file_name: &str) {
    for subdir in SDK_SUBDIRS {
        candidates.push(root.join(subdir).join(file_name));
    }
}

fn executable_name(tool: &str) -> String {
    if cfg!(windows) && !tool.ends_with(".exe") {
        format!("{tool}.exe")
    } else {
        tool.to_string()
    }
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, b"#!/bin/sh\n").expect("write");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod");
        }
    }

    #[test]
    fn strips_wrapping_quotes() {
        assert_eq!(
            normalize_command_path("  \"/opt/android/sdk\"  "),
            "/opt/android/sdk"
        );
        assert_eq!(normalize_command_path("'/opt/android/sdk'"), "/opt/android/sdk");
        assert_eq!(normalize_command_path("   "), "");
    }

    #[test]
    fn sdk_root_candidates_come_before_conventional_locations() {
        let locator = ToolLocator::with_roots(
            vec![PathBuf::from("/sdk")],
            vec![PathBuf::from("/usr/local/bin")],
            Some(PathBuf::from("/home/dev")),
        );
        let name = executable_name("adb");
        let candidates = locator.candidates("adb");
        assert_eq!(candidates[0], PathBuf::from("/sdk/platform-tools").join(&name));
        assert_eq!(candidates[3], PathBuf::from("/sdk/tools/bin").join(&name));
        assert_eq!(candidates[4], PathBuf::from("/usr/local/bin").join(&name));
        assert_eq!(
            candidates[5],
            PathBuf::from("/home/dev/Library/Android/sdk/platform-tools").join(&name)
        );
        assert_eq!(candidates.len(), 4 + 1 + 8);
    }

    #[test]
    fn locates_first_existing_candidate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sdk = dir.path().join("sdk");
        let home = dir.path().join("home");
        let name = executable_name("emulator");
        touch(&sdk.join("emulator").join(&name));
        touch(&home.join("Android/Sdk/emulator").join(&name));

        let locator = ToolLocator::with_roots(vec![sdk.clone()], vec![], Some(home));
        assert_eq!(locator.locate("emulator"), Some(sdk.join("emulator").join(&name)));
    }

    #[test]
    fn falls_back_to_home_sdk_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let home = dir.path().join("home");
        let name = executable_name("adb");
        touch(&home.join("Android/Sdk/platform-tools").join(&name));

        let locator = ToolLocator::with_roots(vec![dir.path().join("missing")], vec![], Some(home.clone()));
        assert_eq!(
            locator.locate("adb"),
            Some(home.join("Android/Sdk/platform-tools").join(&name))
        );
    }

    #[test]
    fn missing_tool_is_none_and_directories_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sdk = dir.path().join("sdk");
        fs::create_dir_all(sdk.join("platform-tools").join(executable_name("adb"))).expect("mkdir");

        let locator = ToolLocator::with_roots(vec![sdk], vec![], None);
        assert_eq!(locator.locate("adb"), None);
        // Repeated lookups stay side-effect free.
        assert_eq!(locator.locate("adb"), None);
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_candidates_are_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let sdk = dir.path().join("sdk");
        let home = dir.path().join("home");
        let plain = sdk.join("platform-tools").join("adb");
        fs::create_dir_all(plain.parent().expect("parent")).expect("mkdir");
        fs::write(&plain, b"not a program").expect("write");
        fs::set_permissions(&plain, fs::Permissions::from_mode(0o644)).expect("chmod");
        touch(&home.join("Android/Sdk/platform-tools/adb"));

        let locator = ToolLocator::with_roots(vec![sdk], vec![], Some(home.clone()));
        assert_eq!(
            locator.locate("adb"),
            Some(home.join("Android/Sdk/platform-tools/adb"))
        );
    }

    #[test]
    fn host_tools_are_found_on_search_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let name = executable_name("xcrun-test-tool");
        touch(&dir.path().join(&name));

        let locator = ToolLocator::default().with_search_path(vec![dir.path().to_path_buf()]);
        assert_eq!(
            locator.locate_host_tool("xcrun-test-tool"),
            Some(dir.path().join(&name))
        );
        assert_eq!(locator.locate_host_tool("definitely-not-installed-tool"), None);
    }
}
