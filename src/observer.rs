//! Observers
//!
//! The archive reports every operation to a list of observers after it
//! finishes. Observers only receive notifications; the archive never looks
//! at what they do with them.

use std::fmt;

use crossbeam::channel::Sender;
use parking_lot::Mutex;

/// Operations reported to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveAction {
    Added,
    Extracted,
    Removed,
    Listed,
    Dumped,
    Compacted,
}

impl fmt::Display for ArchiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArchiveAction::Added => "added",
            ArchiveAction::Extracted => "extracted",
            ArchiveAction::Removed => "removed",
            ArchiveAction::Listed => "listed",
            ArchiveAction::Dumped => "dumped",
            ArchiveAction::Compacted => "compacted",
        };
        f.write_str(name)
    }
}

/// One notification as delivered to an observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEvent {
    pub action: ArchiveAction,
    /// File name; empty for list, dump and compact
    pub name: String,
    pub success: bool,
}

/// Listener capability held by an [`Archive`](crate::Archive)
pub trait ArchiveObserver: Send + Sync {
    fn notify(&self, action: ArchiveAction, name: &str, success: bool);
}

impl<F> ArchiveObserver for F
where
    F: Fn(ArchiveAction, &str, bool) + Send + Sync,
{
    fn notify(&self, action: ArchiveAction, name: &str, success: bool) {
        self(action, name, success)
    }
}

// =============================================================================
// Stock Observers
// =============================================================================

/// Logs each notification through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ArchiveObserver for TracingObserver {
    fn notify(&self, action: ArchiveAction, name: &str, success: bool) {
        if success {
            tracing::info!(%action, name, "archive operation succeeded");
        } else {
            tracing::warn!(%action, name, "archive operation failed");
        }
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<ArchiveEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far
    pub fn events(&self) -> Vec<ArchiveEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ArchiveObserver for EventLog {
    fn notify(&self, action: ArchiveAction, name: &str, success: bool) {
        self.events.lock().push(ArchiveEvent {
            action,
            name: name.to_string(),
            success,
        });
    }
}

/// Forwards notifications to a channel
///
/// A disconnected receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: Sender<ArchiveEvent>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<ArchiveEvent>) -> Self {
        Self { sender }
    }
}

impl ArchiveObserver for ChannelObserver {
    fn notify(&self, action: ArchiveAction, name: &str, success: bool) {
        let _ = self.sender.send(ArchiveEvent {
            action,
            name: name.to_string(),
            success,
        });
    }
}
