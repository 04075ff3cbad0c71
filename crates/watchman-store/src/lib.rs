//! Storage layer: durable key-value backends and the roster and log stores built on them.

mod error;
pub use error::StoreError;

pub mod kv;
pub use kv::{FileStore, KeyValueStore, MemoryStore};

pub mod log;
pub use log::{LOG_KEY, LogStore, LogSummary};

pub mod roster;
pub use roster::{ROSTER_KEY, RosterStore, default_roster};
