//! Core types, identifiers, and configuration shared across Watchman crates.

pub mod clock;
pub mod config;
pub mod model;

pub use clock::{IdClock, display_now, display_time};
pub use config::{ConfigError, FrameSettings, WatchmanConfig};
pub use model::{
    AnalysisResult, AnalysisStatus, AuthorizedPerson, Frame, LogStatus, Role, SurveillanceLog,
};
