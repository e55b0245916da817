use std::collections::HashSet;

use crate::app::models::{CategoryPreference, Device, DeviceGroup};

/// Section order for grouped lists. Labels not listed here sort alphabetically after these,
/// and "Other" always comes last.
pub const GROUP_ORDER: &[&str] = &[
    "iPhone",
    "iPad",
    "Apple Watch",
    "Apple TV",
    "Apple Vision",
    "HomePod",
    "iPod",
    "Mac",
    "Android Phone",
    "Android Tablet",
    "Android TV",
    "Android Wear",
];

/// Both adapters already emit the common shape; unification is concatenation.
/// Simulator UUIDs and AVD names never collide, see [`ids_are_disjoint`].
pub fn unify(ios: Vec<Device>, android: Vec<Device>) -> Vec<Device> {
    let mut devices = ios;
    devices.extend(android);
    devices
}

pub fn ids_are_disjoint(devices: &[Device]) -> bool {
    let mut seen = HashSet::with_capacity(devices.len());
    devices.iter().all(|device| seen.insert(device.id.as_str()))
}

/// Case-insensitive search over name, OS label and family label, restricted to `category`.
pub fn filter_devices(devices: &[Device], search: &str, category: CategoryPreference) -> Vec<Device> {
    let needle = search.trim().to_lowercase();
    devices
        .iter()
        .filter(|device| category.matches(device.category))
        .filter(|device| {
            needle.is_empty()
                || device.name.to_lowercase().contains(&needle)
                || device.os_label.to_lowercase().contains(&needle)
                || device.family_label.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

pub fn group_devices(devices: &[Device]) -> Vec<DeviceGroup> {
    let mut groups: Vec<DeviceGroup> = Vec::new();
    for device in devices {
        match groups
            .iter_mut()
            .find(|group| group.title == device.family_label)
        {
            Some(group) => group.devices.push(device.clone()),
            None => groups.push(DeviceGroup {
                title: device.family_label.clone(),
                devices: vec![device.clone()],
            }),
        }
    }
    groups.sort_by(|a, b| group_rank(&a.title).cmp(&group_rank(&b.title)));
    groups
}

fn group_rank(title: &str) -> (usize, String) {
    if title == "Other" {
        return (GROUP_ORDER.len() + 1, String::new());
    }
    match GROUP_ORDER.iter().position(|known| *known == title) {
        Some(index) => (index, String::new()),
        None => (GROUP_ORDER.len(), title.to_string()),
    }
}
