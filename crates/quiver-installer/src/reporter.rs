use std::path::PathBuf;

use resource_types::ResourceId;

/// A tagged progress event from the installer.
///
/// Per resource, events arrive in pipeline order (started, downloaded,
/// verified, installed); events from different resources interleave under
/// parallel execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Started(ResourceId),
    Downloaded(ResourceId, u64),
    Verified(ResourceId),
    Installed(ResourceId, PathBuf),
    Skipped(ResourceId),
    Failed(ResourceId, String),
}

/// Receives progress events during a batch install.
///
/// Callbacks must not block: they run on the install tasks themselves, so
/// long work should be handed off elsewhere.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Collects events in memory; mostly useful in tests.
#[derive(Debug, Default)]
pub struct EventLog(std::sync::Mutex<Vec<ProgressEvent>>);

impl EventLog {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl ProgressSink for EventLog {
    fn on_event(&self, event: ProgressEvent) {
        self.0.lock().unwrap().push(event);
    }
}
