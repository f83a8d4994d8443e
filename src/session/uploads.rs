//! Upload progress bookkeeping.
//!
//! While the upload step of a submission runs, the backend streams
//! [`UploadEvent`]s keyed `actionId[index]`. This module owns the map those
//! events land in. Bookkeeping is strictly cosmetic: a malformed or unknown
//! event is logged and dropped, it never disturbs the transfer itself.

use ahash::AHashMap;
use futures::StreamExt;
use futures::channel::mpsc::UnboundedReceiver;
use tracing::warn;

use crate::api::types::UploadEvent;

/// Transfer state of one staged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub total: u64,
    pub loaded: u64,
}

impl UploadProgress {
    pub fn new(total: u64) -> Self {
        Self { total, loaded: 0 }
    }

    pub fn is_complete(&self) -> bool {
        self.loaded >= self.total
    }

    /// Completed fraction in `0.0..=1.0`. A zero-byte file counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.loaded as f64 / self.total as f64
        }
    }
}

/// The key a file's progress is tracked under.
pub fn upload_key(action_id: &str, index: usize) -> String {
    format!("{action_id}[{index}]")
}

/// Sums `(loaded, total)` across all entries, for an overall progress bar.
pub fn overall(entries: &AHashMap<String, UploadProgress>) -> (u64, u64) {
    entries.values().fold((0, 0), |(loaded, total), progress| {
        (loaded + progress.loaded, total + progress.total)
    })
}

/// Applies progress events to the bookkeeping map until the backend drops its
/// sender side.
pub(crate) async fn drain_progress(
    mut events: UnboundedReceiver<UploadEvent>,
    entries: &mut AHashMap<String, UploadProgress>,
) {
    while let Some(event) = events.next().await {
        match entries.get_mut(&event.key) {
            Some(progress) => progress.loaded = event.loaded.min(progress.total),
            None => warn!(key = %event.key, "progress event for unknown upload entry"),
        }
    }
}
