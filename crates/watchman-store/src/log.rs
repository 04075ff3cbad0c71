//! Capped, newest-first surveillance log.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};
use watchman_core::config::DEFAULT_LOG_CAPACITY;
use watchman_core::{LogStatus, SurveillanceLog};

use crate::StoreError;
use crate::kv::{KeyValueStore, load_json, save_json};

/// Storage key holding the serialized log array.
pub const LOG_KEY: &str = "school_surveillance_logs";

/// Counts over the retained log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSummary {
    pub total: usize,
    pub authorized: usize,
    pub unauthorized: usize,
}

/// Surveillance log holding at most `capacity` entries, newest first.
///
/// Persisted in full under [`LOG_KEY`] after every mutation.
pub struct LogStore {
    kv: Arc<dyn KeyValueStore>,
    entries: Mutex<VecDeque<SurveillanceLog>>,
    capacity: usize,
}

impl LogStore {
    /// Open with the standard capacity of 100 entries.
    pub fn open(kv: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        Self::open_with_capacity(kv, DEFAULT_LOG_CAPACITY)
    }

    /// Hydrate from storage, or start empty when the key is absent or unreadable.
    ///
    /// `capacity` is clamped to `1..=100`. Stored logs longer than the
    /// capacity keep only their newest entries.
    pub fn open_with_capacity(
        kv: Arc<dyn KeyValueStore>,
        capacity: usize,
    ) -> Result<Self, StoreError> {
        let capacity = capacity.clamp(1, DEFAULT_LOG_CAPACITY);
        let mut entries: VecDeque<SurveillanceLog> =
            match load_json::<Vec<SurveillanceLog>>(kv.as_ref(), LOG_KEY) {
                Ok(Some(stored)) => stored.into(),
                Ok(None) => VecDeque::new(),
                Err(StoreError::Json(e)) => {
                    warn!(error = %e, "stored log is corrupt, starting empty");
                    VecDeque::new()
                }
                Err(e) => return Err(e),
            };
        if entries.len() > capacity {
            warn!(
                stored = entries.len(),
                capacity, "stored log exceeds capacity, truncating"
            );
            entries.truncate(capacity);
        }
        info!(count = entries.len(), capacity, "surveillance log loaded");

        Ok(Self {
            kv,
            entries: Mutex::new(entries),
            capacity,
        })
    }

    /// Insert `entry` as the newest, evicting the oldest beyond capacity.
    pub fn append(&self, entry: SurveillanceLog) -> Result<(), StoreError> {
        let mut entries = self.lock();
        debug!(id = %entry.id, status = entry.status.as_str(), "appending log entry");
        entries.push_front(entry);
        if entries.len() > self.capacity {
            entries.truncate(self.capacity);
        }
        self.persist(&entries)
    }

    /// Remove every entry. Confirmation is the caller's concern.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.lock();
        let dropped = entries.len();
        entries.clear();
        info!(dropped, "surveillance log cleared");
        self.persist(&entries)
    }

    /// Snapshot, newest first.
    pub fn list(&self) -> Vec<SurveillanceLog> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn summary(&self) -> LogSummary {
        let entries = self.lock();
        let mut summary = LogSummary {
            total: entries.len(),
            ..LogSummary::default()
        };
        for entry in entries.iter() {
            match entry.status {
                LogStatus::Authorized => summary.authorized += 1,
                LogStatus::Unauthorized => summary.unauthorized += 1,
                LogStatus::Warning | LogStatus::Info => {}
            }
        }
        summary
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<SurveillanceLog>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &VecDeque<SurveillanceLog>) -> Result<(), StoreError> {
        save_json(self.kv.as_ref(), LOG_KEY, entries).inspect_err(|e| {
            warn!(error = %e, "failed to persist surveillance log");
        })
    }
}
