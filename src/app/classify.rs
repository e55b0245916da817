//! Ordered rule tables that turn vendor strings into a device family and an OS label.
//!
//! Every table is evaluated top to bottom and the first matching rule wins, so more specific
//! patterns must precede generic ones (a "pixel_tablet" profile must not be caught by a phone rule).

use std::sync::OnceLock;

use regex::Regex;

use crate::app::models::DeviceFamily;

const SIM_RUNTIME_PREFIX: &str = "com.apple.CoreSimulator.SimRuntime.";
const SIM_PLATFORMS: [&str; 5] = ["iOS", "tvOS", "watchOS", "visionOS", "xrOS"];

pub const UNKNOWN_OS_LABEL: &str = "Unknown";
pub const ANDROID_PHONE_LABEL: &str = "Android Phone";
pub const OTHER_LABEL: &str = "Other";

/// A regex compiled on first use and shared afterwards.
#[derive(Debug)]
pub struct CachedRegex {
    source: &'static str,
    compiled: OnceLock<Option<Regex>>,
}

impl CachedRegex {
    pub const fn new(source: &'static str) -> Self {
        Self {
            source,
            compiled: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Option<&Regex> {
        self.compiled
            .get_or_init(|| Regex::new(self.source).ok())
            .as_ref()
    }
}

impl PartialEq for CachedRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for CachedRegex {}

static PIXEL_PROFILE: CachedRegex = CachedRegex::new(r"pixel_[0-9]");
static SYSDIR_API_LEVEL: CachedRegex = CachedRegex::new(r"android-(\d+)");
static TARGET_API_LEVEL: CachedRegex = CachedRegex::new(r"^\s*(?:android-)?(\d+)");
static NAME_API_LEVEL: CachedRegex = CachedRegex::new(r"(?i)API_(\d+)");
static NAME_ANDROID_LEVEL: CachedRegex = CachedRegex::new(r"(?i)Android_(\d+)");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Contains(&'static str),
    Regex(&'static CachedRegex),
}

impl Pattern {
    fn matches(&self, haystack: &str) -> bool {
        match self {
            Pattern::Contains(needle) => haystack.contains(needle),
            Pattern::Regex(re) => re.get().is_some_and(|re| re.is_match(haystack)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyRule {
    pub pattern: Pattern,
    pub family: DeviceFamily,
    pub label: &'static str,
}

const fn rule(pattern: Pattern, family: DeviceFamily, label: &'static str) -> FamilyRule {
    FamilyRule {
        pattern,
        family,
        label,
    }
}

/// Matched against the simulator's display name.
pub static SIMULATOR_FAMILY_RULES: &[FamilyRule] = &[
    rule(Pattern::Contains("iPhone"), DeviceFamily::Phone, "iPhone"),
    rule(Pattern::Contains("iPad"), DeviceFamily::Tablet, "iPad"),
    rule(Pattern::Contains("Apple Watch"), DeviceFamily::Wearable, "Apple Watch"),
    rule(Pattern::Contains("Apple TV"), DeviceFamily::Tv, "Apple TV"),
    rule(Pattern::Contains("Apple Vision"), DeviceFamily::Other, "Apple Vision"),
    rule(Pattern::Contains("HomePod"), DeviceFamily::Other, "HomePod"),
    rule(Pattern::Contains("iPod"), DeviceFamily::Phone, "iPod"),
    rule(Pattern::Contains("Mac"), DeviceFamily::Desktop, "Mac"),
];

/// Matched against the lowercased `hw.device.name` of an AVD.
pub static AVD_FAMILY_RULES: &[FamilyRule] = &[
    rule(Pattern::Contains("small_phone"), DeviceFamily::Phone, ANDROID_PHONE_LABEL),
    rule(Pattern::Contains("medium_phone"), DeviceFamily::Phone, ANDROID_PHONE_LABEL),
    rule(Pattern::Contains("large_phone"), DeviceFamily::Phone, ANDROID_PHONE_LABEL),
    rule(Pattern::Regex(&PIXEL_PROFILE), DeviceFamily::Phone, ANDROID_PHONE_LABEL),
    rule(Pattern::Contains("tablet"), DeviceFamily::Tablet, "Android Tablet"),
    rule(Pattern::Contains("tv"), DeviceFamily::Tv, "Android TV"),
    rule(Pattern::Contains("wear"), DeviceFamily::Wearable, "Android Wear"),
];

/// API level to marketing version.
pub const ANDROID_VERSIONS: &[(u32, &str)] = &[
    (36, "16.0"),
    (35, "15.0"),
    (34, "14.0"),
    (33, "13.0"),
    (32, "12.1"),
    (31, "12.0"),
    (30, "11.0"),
    (29, "10.0"),
    (28, "9.0"),
    (27, "8.1"),
    (26, "8.0"),
    (25, "7.1"),
    (24, "7.0"),
    (23, "6.0"),
    (22, "5.1"),
    (21, "5.0"),
];

pub fn first_match(rules: &'static [FamilyRule], haystack: &str) -> Option<&'static FamilyRule> {
    rules.iter().find(|rule| rule.pattern.matches(haystack))
}

/// Family and grouping label for a simulator name; unmatched names are `Other`.
pub fn classify_simulator(name: &str) -> (DeviceFamily, String) {
    first_match(SIMULATOR_FAMILY_RULES, name)
        .map(|rule| (rule.family, rule.label.to_string()))
        .unwrap_or((DeviceFamily::Other, OTHER_LABEL.to_string()))
}

/// Family and grouping label for an AVD hardware profile; unmatched profiles are phones.
pub fn classify_avd_hardware(hw_device_name: Option<&str>) -> (DeviceFamily, String) {
    hw_device_name
        .map(|value| value.to_lowercase())
        .and_then(|value| first_match(AVD_FAMILY_RULES, &value))
        .map(|rule| (rule.family, rule.label.to_string()))
        .unwrap_or((DeviceFamily::Phone, ANDROID_PHONE_LABEL.to_string()))
}

/// `com.apple.CoreSimulator.SimRuntime.iOS-17-0` -> `iOS-17-0`.
pub fn short_runtime(identifier: &str) -> &str {
    identifier
        .strip_prefix(SIM_RUNTIME_PREFIX)
        .unwrap_or(identifier)
}

/// `iOS-17-0` -> `iOS 17.0`; unknown platforms keep their name with dashes turned into dots.
pub fn simulator_os_label(runtime_identifier: &str) -> String {
    let short = short_runtime(runtime_identifier).trim();
    if short.is_empty() {
        return UNKNOWN_OS_LABEL.to_string();
    }
    for platform in SIM_PLATFORMS {
        if let Some(version) = short
            .strip_prefix(platform)
            .and_then(|rest| rest.strip_prefix('-'))
        {
            return format!("{platform} {}", version.replace('-', "."));
        }
    }
    short.replace('-', ".")
}

pub fn android_version_label(api_level: u32) -> String {
    ANDROID_VERSIONS
        .iter()
        .find(|(level, _)| *level == api_level)
        .map(|(_, version)| format!("Android {version}"))
        .unwrap_or_else(|| format!("API {api_level}"))
}

pub fn api_level_from_sysdir(value: &str) -> Option<u32> {
    capture_number(&SYSDIR_API_LEVEL, value)
}

pub fn api_level_from_target(value: &str) -> Option<u32> {
    capture_number(&TARGET_API_LEVEL, value)
}

pub fn api_level_from_avd_name(name: &str) -> Option<u32> {
    capture_number(&NAME_API_LEVEL, name).or_else(|| capture_number(&NAME_ANDROID_LEVEL, name))
}

fn capture_number(pattern: &CachedRegex, haystack: &str) -> Option<u32> {
    pattern
        .get()?
        .captures(haystack)?
        .get(1)?
        .as_str()
        .parse::<u32>()
        .ok()
}
