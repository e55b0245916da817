//! Background refresh of the unified device list.
//!
//! One worker thread owns the timer and runs discovery; everything else talks to it over a
//! channel. Because there is a single worker, discovery runs never overlap, and refresh
//! requests that arrive while a run is in flight are answered with that run's result.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::android::discovery::discover_android;
use crate::app::config::DeviceSettings;
use crate::app::error::AppError;
use crate::app::host::runner::ToolRunner;
use crate::app::host::toolchain::Toolchain;
use crate::app::ios::discovery::discover_ios;
use crate::app::models::{Device, DeviceSnapshot};
use crate::app::unify::unify;

/// Produces the full device list for one refresh cycle.
pub trait DeviceSource: Send + Sync {
    fn fetch(&self, trace_id: &str) -> Result<Vec<Device>, AppError>;
}

/// Both platform adapters behind the capability flags and category preference.
pub struct Discovery {
    toolchain: Toolchain,
    runner: Arc<dyn ToolRunner>,
    avd_home: PathBuf,
    settings: DeviceSettings,
}

impl Discovery {
    pub fn new(
        toolchain: Toolchain,
        runner: Arc<dyn ToolRunner>,
        avd_home: PathBuf,
        settings: DeviceSettings,
    ) -> Self {
        Self {
            toolchain,
            runner,
            avd_home,
            settings,
        }
    }
}

impl DeviceSource for Discovery {
    fn fetch(&self, trace_id: &str) -> Result<Vec<Device>, AppError> {
        let ios = if self.settings.fetch_ios() {
            match discover_ios(&self.toolchain, self.runner.as_ref(), trace_id) {
                Ok(devices) => devices,
                // Missing xcrun means the capability is absent: skip the adapter.
                Err(err) if err.is_tool_not_found() => {
                    warn!(trace_id = %trace_id, error = %err, "skipping simulator discovery");
                    Vec::new()
                }
                Err(err) => return Err(err),
            }
        } else {
            Vec::new()
        };
        let android = if self.settings.fetch_android() {
            discover_android(
                &self.toolchain,
                self.runner.as_ref(),
                &self.avd_home,
                trace_id,
            )
        } else {
            Vec::new()
        };
        Ok(unify(ios, android))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PollPhase {
    Idle,
    Fetching,
    Ready,
    Error,
}

/// Anything that can be asked to refresh without waiting for the result.
pub trait RefreshTrigger: Send + Sync {
    fn request_refresh(&self);
}

enum PollRequest {
    Refresh(Option<Sender<Arc<DeviceSnapshot>>>),
    Stop,
}

struct Shared {
    snapshot: RwLock<Arc<DeviceSnapshot>>,
    phase: Mutex<PollPhase>,
    stopping: AtomicBool,
}

impl Shared {
    fn set_phase(&self, phase: PollPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }
}

pub struct Poller {
    shared: Arc<Shared>,
    sender: Mutex<Sender<PollRequest>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    /// Spawns the worker and immediately starts the first fetch.
    pub fn start(source: Arc<dyn DeviceSource>, interval: Duration) -> Self {
        let shared = Arc::new(Shared {
            snapshot: RwLock::new(Arc::new(DeviceSnapshot::default())),
            phase: Mutex::new(PollPhase::Idle),
            stopping: AtomicBool::new(false),
        });
        let (sender, receiver) = mpsc::channel();
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("simdeck-poller".to_string())
            .spawn(move || run_worker(worker_shared, source, receiver, interval))
            .map_err(|err| warn!(error = %err, "failed to spawn poller thread"))
            .ok();
        if worker.is_none() {
            shared.stopping.store(true, Ordering::SeqCst);
        }
        Self {
            shared,
            sender: Mutex::new(sender),
            worker: Mutex::new(worker),
        }
    }

    pub fn snapshot(&self) -> Arc<DeviceSnapshot> {
        Arc::clone(
            &self
                .shared
                .snapshot
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    pub fn phase(&self) -> PollPhase {
        *self.shared.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_refreshing(&self) -> bool {
        self.phase() == PollPhase::Fetching
    }

    /// Waits for the in-flight fetch, or a new one when idle, and returns what it published.
    pub fn refresh(&self, trace_id: &str) -> Result<Arc<DeviceSnapshot>, AppError> {
        let (reply, result) = mpsc::channel();
        if self.send(PollRequest::Refresh(Some(reply))).is_err() {
            return Err(AppError::system("Device poller is stopped", trace_id));
        }
        result
            .recv()
            .map_err(|_| AppError::system("Device poller stopped before refresh completed", trace_id))
    }

    pub fn request_refresh(&self) {
        if self.send(PollRequest::Refresh(None)).is_err() {
            debug!("refresh requested after poller stopped");
        }
    }

    /// Stops the worker and waits for it. A fetch still running is finished but not published.
    pub fn stop(&self) {
        if self.shared.stopping.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.send(PollRequest::Stop);
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("poller thread panicked");
            }
        }
        self.shared.set_phase(PollPhase::Idle);
        info!("device poller stopped");
    }

    fn send(&self, request: PollRequest) -> Result<(), mpsc::SendError<PollRequest>> {
        if self.shared.stopping.load(Ordering::SeqCst) && matches!(request, PollRequest::Refresh(_)) {
            return Err(mpsc::SendError(request));
        }
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(request)
    }
}

impl RefreshTrigger for Poller {
    fn request_refresh(&self) {
        Poller::request_refresh(self);
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(
    shared: Arc<Shared>,
    source: Arc<dyn DeviceSource>,
    receiver: Receiver<PollRequest>,
    interval: Duration,
) {
    let mut waiters: Vec<Sender<Arc<DeviceSnapshot>>> = Vec::new();
    let mut fetch_now = true;
    info!(interval_ms = interval.as_millis() as u64, "device poller started");

    loop {
        if !fetch_now {
            match receiver.recv_timeout(interval) {
                Ok(PollRequest::Refresh(reply)) => waiters.extend(reply),
                Ok(PollRequest::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
        fetch_now = false;
        if shared.stopping.load(Ordering::SeqCst) {
            break;
        }

        shared.set_phase(PollPhase::Fetching);
        let trace_id = Uuid::new_v4().to_string();
        let result = source.fetch(&trace_id);

        let mut stop_requested = false;
        while let Ok(request) = receiver.try_recv() {
            match request {
                PollRequest::Refresh(reply) => waiters.extend(reply),
                PollRequest::Stop => stop_requested = true,
            }
        }
        if stop_requested || shared.stopping.load(Ordering::SeqCst) {
            debug!(trace_id = %trace_id, "discarding fetch finished during shutdown");
            break;
        }

        let snapshot = publish(&shared, result, &trace_id);
        for waiter in waiters.drain(..) {
            let _ = waiter.send(Arc::clone(&snapshot));
        }
    }
}

fn publish(
    shared: &Shared,
    result: Result<Vec<Device>, AppError>,
    trace_id: &str,
) -> Arc<DeviceSnapshot> {
    let mut current = shared
        .snapshot
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    let generation = current.generation + 1;
    let (next, phase) = match result {
        Ok(devices) => {
            debug!(
                trace_id = %trace_id,
                generation,
                count = devices.len(),
                "device snapshot refreshed"
            );
            (
                DeviceSnapshot {
                    generation,
                    devices,
                    refreshed_at: Some(chrono::Utc::now().to_rfc3339()),
                    last_error: None,
                },
                PollPhase::Ready,
            )
        }
        Err(err) => {
            warn!(trace_id = %trace_id, generation, error = %err, "device refresh failed");
            (
                DeviceSnapshot {
                    generation,
                    devices: current.devices.clone(),
                    refreshed_at: current.refreshed_at.clone(),
                    last_error: Some(err),
                },
                PollPhase::Error,
            )
        }
    };
    let next = Arc::new(next);
    *current = Arc::clone(&next);
    drop(current);
    shared.set_phase(phase);
    next
}
