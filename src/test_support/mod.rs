//! Test utilities shared across crate-level unit tests.

use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use crate::logger::{LogArgument, LogLevel, Logger};
use crate::umami::document::MemoryDocument;
use crate::umami::tracker::{EmptyTrackerSlot, IdentifyCall, SharedTrackerSlot, TrackCall, UmamiTracker};
use crate::umami::{UmamiConfig, UmamiService};

pub const TEST_SCRIPT_URL: &str = "https://analytics.example.com/script.js";

const ENV_VARS: [&str; 4] = [
    "__UMAMI_DEFAULTS__",
    "__UMAMI_DEFAULTS_PATH",
    "UMAMI_CONFIG",
    "UMAMI_ENV_FORCE",
];

static ENV_GUARD: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Serializes tests that touch process environment variables. The variables read by
/// `platform::environment` are cleared on entry and again when the guard drops.
pub struct EnvGuard {
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    pub fn set(&self, name: &str, value: &str) {
        std::env::set_var(name, value);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        clear_env();
    }
}

pub fn lock_env() -> EnvGuard {
    let lock = ENV_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
    clear_env();
    EnvGuard { _lock: lock }
}

fn clear_env() {
    for name in ENV_VARS {
        std::env::remove_var(name);
    }
}

/// Writes `contents` to a fresh file in the temp directory and returns its path.
pub fn temp_json_file(label: &str, contents: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!(
        "umami_rs_sdk_{label}_{}_{}.json",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::write(&path, contents).unwrap();
    path
}

/// Tracker that records every call it receives.
#[derive(Clone, Default)]
pub struct RecordingTracker {
    track_calls: Arc<Mutex<Vec<TrackCall>>>,
    identify_calls: Arc<Mutex<Vec<IdentifyCall>>>,
}

impl RecordingTracker {
    pub fn track_calls(&self) -> Vec<TrackCall> {
        self.track_calls.lock().unwrap().clone()
    }

    pub fn identify_calls(&self) -> Vec<IdentifyCall> {
        self.identify_calls.lock().unwrap().clone()
    }
}

impl UmamiTracker for RecordingTracker {
    fn track(&self, call: TrackCall) {
        self.track_calls.lock().unwrap().push(call);
    }

    fn identify(&self, call: IdentifyCall) {
        self.identify_calls.lock().unwrap().push(call);
    }
}

/// Replaces the handler of `logger` with one that records every line, whatever its level.
pub fn capture_logs(logger: &Logger) -> Arc<Mutex<Vec<(LogLevel, String)>>> {
    let records = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&records);
    logger.set_log_handler(move |_, level, args: &[LogArgument]| {
        let message = args
            .iter()
            .filter_map(LogArgument::to_message_fragment)
            .collect::<Vec<_>>()
            .join(" ");
        sink.lock().unwrap().push((level, message));
    });
    records
}

pub fn browser_document() -> MemoryDocument {
    MemoryDocument::browser("localhost")
}

/// A started service on a browser document with a recording tracker installed.
pub fn tracked_service() -> (UmamiService, RecordingTracker) {
    let tracker = RecordingTracker::default();
    let slot = SharedTrackerSlot::new();
    slot.install(Arc::new(tracker.clone()));
    let service = UmamiService::with_capabilities(
        UmamiConfig::new("test-website-id", TEST_SCRIPT_URL),
        Arc::new(browser_document()),
        Arc::new(slot),
    );
    service.start();
    (service, tracker)
}

pub fn started_service_without_tracker() -> UmamiService {
    let service = UmamiService::with_capabilities(
        UmamiConfig::new("test-website-id", TEST_SCRIPT_URL),
        Arc::new(browser_document()),
        Arc::new(EmptyTrackerSlot),
    );
    service.start();
    service
}
