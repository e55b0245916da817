use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

use simdeck_lib::app::config::load_config;
use simdeck_lib::app::logging::init_logging;
use simdeck_lib::app::manager::DeviceManager;
use simdeck_lib::app::unify::ids_are_disjoint;

#[derive(Debug, Clone)]
struct Args {
    duration_secs: u64,
    interval_ms: u64,
    json: bool,
}

#[derive(Serialize)]
struct SoakSummary {
    tool: &'static str,
    status: &'static str,
    trace_id: String,
    iterations: usize,
    failures: usize,
    warnings: usize,
    last_generation: u64,
    device_count: usize,
    checks: Vec<SoakIteration>,
}

#[derive(Serialize)]
struct SoakIteration {
    index: usize,
    status: &'static str, // pass|fail|warn
    duration_ms: u128,
    generation: u64,
    device_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut duration_secs: u64 = 60;
    let mut interval_ms: u64 = 1_000;
    let mut json = false;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--duration-secs" => {
                let value = it
                    .next()
                    .ok_or_else(|| "--duration-secs requires a value".to_string())?;
                duration_secs = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| "--duration-secs must be a number".to_string())?;
            }
            "--interval-ms" => {
                let value = it
                    .next()
                    .ok_or_else(|| "--interval-ms requires a value".to_string())?;
                interval_ms = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| "--interval-ms must be a number".to_string())?;
            }
            "--json" => json = true,
            "-h" | "--help" => {
                return Err("Usage: cargo run --bin soak -- [--duration-secs N] [--interval-ms N] [--json]\n".to_string());
            }
            other => return Err(format!("Unknown arg: {other}")),
        }
    }

    Ok(Args {
        duration_secs: duration_secs.max(5),
        interval_ms: interval_ms.clamp(200, 10_000),
        json,
    })
}

fn main() {
    let args = match parse_args() {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let trace_id = Uuid::new_v4().to_string();
    let mut config = match load_config(&trace_id) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("Failed to load config: {err}");
            std::process::exit(1);
        }
    };
    init_logging(&config.logging);
    // Hammer explicit refreshes; the timer would only add noise.
    config.device.refresh_interval_ms = 60 * 60 * 1_000;

    let manager = DeviceManager::start(&config);
    let deadline = Instant::now() + Duration::from_secs(args.duration_secs);

    let mut iterations: Vec<SoakIteration> = Vec::new();
    let mut failures = 0usize;
    let mut warnings = 0usize;
    let mut last_generation = 0u64;
    let mut previous_ids: Option<HashSet<String>> = None;

    let mut index = 0usize;
    while Instant::now() < deadline {
        index += 1;
        let iter_start = Instant::now();
        let mut status = "pass";
        let mut error: Option<String> = None;
        let mut generation = last_generation;
        let mut device_count = 0usize;

        match manager.refresh(Some(format!("{trace_id}-{index}"))) {
            Ok(response) => {
                let snapshot = response.data;
                generation = snapshot.generation;
                device_count = snapshot.devices.len();
                if snapshot.generation <= last_generation {
                    status = "fail";
                    error = Some(format!(
                        "generation did not advance ({} -> {})",
                        last_generation, snapshot.generation
                    ));
                } else if !ids_are_disjoint(&snapshot.devices) {
                    status = "fail";
                    error = Some("duplicate device ids in snapshot".to_string());
                } else if let Some(err) = &snapshot.last_error {
                    status = "warn";
                    warnings += 1;
                    error = Some(err.to_string());
                } else {
                    let ids = snapshot
                        .devices
                        .iter()
                        .map(|device| device.id.clone())
                        .collect::<HashSet<_>>();
                    if previous_ids.as_ref().is_some_and(|previous| *previous != ids) {
                        status = "warn";
                        warnings += 1;
                        error = Some("device set changed between refreshes".to_string());
                    }
                    previous_ids = Some(ids);
                }
                last_generation = last_generation.max(snapshot.generation);
            }
            Err(err) => {
                status = "fail";
                error = Some(err.to_string());
            }
        }

        if status == "fail" {
            failures += 1;
        }
        iterations.push(SoakIteration {
            index,
            status,
            duration_ms: iter_start.elapsed().as_millis(),
            generation,
            device_count,
            error,
        });
        std::thread::sleep(Duration::from_millis(args.interval_ms));
    }

    let device_count = manager.snapshot(None).data.devices.len();
    manager.stop();

    let overall = if failures > 0 { "fail" } else { "pass" };
    let summary = SoakSummary {
        tool: "simdeck_soak",
        status: overall,
        trace_id,
        iterations: iterations.len(),
        failures,
        warnings,
        last_generation,
        device_count,
        checks: iterations,
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).unwrap_or_default()
        );
    } else {
        println!(
            "status: {}\niterations: {}\nfailures: {}\nwarnings: {}\ngeneration: {}\ndevices: {}\n",
            summary.status,
            summary.iterations,
            summary.failures,
            summary.warnings,
            summary.last_generation,
            summary.device_count
        );
    }

    if overall != "pass" {
        std::process::exit(1);
    }
}
