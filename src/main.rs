use std::thread;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use simdeck_lib::app::config::{config_path, load_config, save_config, AppConfig};
use simdeck_lib::app::error::AppError;
use simdeck_lib::app::logging::init_logging;
use simdeck_lib::app::manager::{execute_once, tool_report_once, DeviceManager};
use simdeck_lib::app::models::{
    CategoryPreference, DeviceAction, DeviceCategory, DeviceGroup, DeviceSnapshot,
};

const USAGE: &str = "Usage: simdeck <command> [options]

Commands:
  list [--json] [--category all|ios|android] [--search TEXT]
  watch [--interval-ms N] [--category all|ios|android] [--search TEXT]
  boot|shutdown|open <ios|android> <device-id> [--json]
  tools [--json]
  config [--write]
";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    List {
        json: bool,
        category: CategoryPreference,
        search: String,
    },
    Watch {
        interval_ms: Option<u64>,
        category: CategoryPreference,
        search: String,
    },
    Device {
        action: DeviceAction,
        category: DeviceCategory,
        device_id: String,
        json: bool,
    },
    Tools {
        json: bool,
    },
    Config {
        write: bool,
    },
}

fn parse_args(args: Vec<String>) -> Result<Command, String> {
    let mut it = args.into_iter();
    let command = it.next().ok_or_else(|| USAGE.to_string())?;

    let mut json = false;
    let mut write = false;
    let mut category = CategoryPreference::All;
    let mut search = String::new();
    let mut interval_ms: Option<u64> = None;
    let mut positional: Vec<String> = Vec::new();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--write" => write = true,
            "--category" => {
                let value = it
                    .next()
                    .ok_or_else(|| "--category requires a value".to_string())?;
                category = CategoryPreference::parse(&value)
                    .ok_or_else(|| format!("Unknown category: {value}"))?;
            }
            "--search" => {
                search = it
                    .next()
                    .ok_or_else(|| "--search requires a value".to_string())?;
            }
            "--interval-ms" => {
                let value = it
                    .next()
                    .ok_or_else(|| "--interval-ms requires a value".to_string())?;
                let parsed = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| "--interval-ms must be a number".to_string())?;
                interval_ms = Some(parsed.max(1_000));
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            other if other.starts_with("--") => return Err(format!("Unknown arg: {other}")),
            _ => positional.push(arg),
        }
    }

    match command.as_str() {
        "list" => Ok(Command::List {
            json,
            category,
            search,
        }),
        "watch" => Ok(Command::Watch {
            interval_ms,
            category,
            search,
        }),
        "tools" => Ok(Command::Tools { json }),
        "config" => Ok(Command::Config { write }),
        "-h" | "--help" | "help" => Err(USAGE.to_string()),
        other => {
            let action =
                DeviceAction::parse(other).ok_or_else(|| format!("Unknown command: {other}\n\n{USAGE}"))?;
            let [platform, device_id]: [String; 2] = positional
                .try_into()
                .map_err(|_| format!("{other} requires <ios|android> <device-id>"))?;
            let category = DeviceCategory::parse(&platform)
                .ok_or_else(|| format!("Unknown platform: {platform}"))?;
            Ok(Command::Device {
                action,
                category,
                device_id,
                json,
            })
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

fn print_groups(groups: &[DeviceGroup]) {
    if groups.is_empty() {
        println!("No devices found.");
        return;
    }
    for group in groups {
        println!("{}", group.title);
        for device in &group.devices {
            println!(
                "  {:<9} {} ({})  {}",
                device.status.label(),
                device.name,
                device.os_label,
                device.id
            );
        }
    }
}

fn report_refresh_error(snapshot: &DeviceSnapshot) {
    if let Some(err) = &snapshot.last_error {
        eprintln!("Last refresh failed: {err}");
    }
}

fn run(command: Command, mut config: AppConfig, trace_id: &str) -> Result<(), AppError> {
    match command {
        Command::List {
            json,
            category,
            search,
        } => {
            let manager = DeviceManager::start(&config);
            let snapshot = manager.refresh(Some(trace_id.to_string()))?.data;
            report_refresh_error(&snapshot);
            if json {
                print_json(&manager.devices(&search, category, Some(trace_id.to_string())));
            } else {
                print_groups(&manager.groups(&search, category, Some(trace_id.to_string())).data);
            }
            manager.stop();
        }
        Command::Watch {
            interval_ms,
            category,
            search,
        } => {
            if let Some(interval_ms) = interval_ms {
                config.device.refresh_interval_ms = interval_ms;
            }
            let manager = DeviceManager::start(&config);
            let mut seen_generation = 0;
            loop {
                let snapshot = manager.snapshot(None).data;
                if snapshot.generation != seen_generation {
                    seen_generation = snapshot.generation;
                    println!(
                        "-- generation {} at {} --",
                        snapshot.generation,
                        snapshot.refreshed_at.as_deref().unwrap_or("never")
                    );
                    report_refresh_error(&snapshot);
                    print_groups(&manager.groups(&search, category, None).data);
                }
                thread::sleep(Duration::from_millis(200));
            }
        }
        Command::Device {
            action,
            category,
            device_id,
            json,
        } => {
            let response = execute_once(
                &config,
                category,
                action,
                &device_id,
                Some(trace_id.to_string()),
            )?;
            if json {
                print_json(&response);
            } else if response.data.dispatched {
                println!("{} {} dispatched", action.as_str(), device_id);
            } else {
                println!("{} {} done", action.as_str(), device_id);
                let stdout = response.data.stdout.trim();
                if !stdout.is_empty() {
                    println!("{stdout}");
                }
            }
        }
        Command::Tools { json } => {
            let report = tool_report_once(&config, Some(trace_id.to_string()));
            if json {
                print_json(&report);
            } else {
                for tool in &report.data {
                    println!(
                        "{:<9} {}",
                        tool.name,
                        tool.command_path.as_deref().unwrap_or("not found")
                    );
                }
            }
        }
        Command::Config { write } => {
            if write {
                save_config(&config, trace_id)?;
                println!("wrote {}", config_path().display());
            } else {
                print_json(&config);
            }
        }
    }
    Ok(())
}

fn main() {
    let command = match parse_args(std::env::args().skip(1).collect()) {
        Ok(command) => command,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let trace_id = Uuid::new_v4().to_string();
    let config = match load_config(&trace_id) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load config: {err}");
            std::process::exit(1);
        }
    };
    init_logging(&config.logging);

    if let Err(err) = run(command, config, &trace_id) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_list_options() {
        let command = parse_args(args(&["list", "--json", "--category", "android", "--search", "pixel"]))
            .expect("parse");
        assert_eq!(
            command,
            Command::List {
                json: true,
                category: CategoryPreference::Android,
                search: "pixel".to_string(),
            }
        );
    }

    #[test]
    fn parses_device_commands() {
        let command = parse_args(args(&["shutdown", "ios", "ABC-123"])).expect("parse");
        assert_eq!(
            command,
            Command::Device {
                action: DeviceAction::Shutdown,
                category: DeviceCategory::Ios,
                device_id: "ABC-123".to_string(),
                json: false,
            }
        );
        assert!(parse_args(args(&["boot", "ios"])).is_err());
        assert!(parse_args(args(&["boot", "windows", "x"])).is_err());
    }

    #[test]
    fn watch_interval_has_a_floor() {
        let command = parse_args(args(&["watch", "--interval-ms", "10"])).expect("parse");
        assert!(matches!(
            command,
            Command::Watch {
                interval_ms: Some(1_000),
                ..
            }
        ));
    }

    #[test]
    fn rejects_unknown_input() {
        assert!(parse_args(Vec::new()).is_err());
        assert!(parse_args(args(&["reboot"])).is_err());
        assert!(parse_args(args(&["list", "--verbose"])).is_err());
    }
}
