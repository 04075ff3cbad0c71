//! Watchman host: camera lifecycle, the periodic capture loop, and assembly
//! of the stores and classifier behind it.

pub mod camera;
pub use camera::{
    CameraAccessError, CameraDevice, DirectoryCamera, FrameCaptureError, VideoSource,
};

pub mod controller;
pub use controller::{CaptureController, ControllerStatus, Phase, TriggerOutcome};

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use watchman_ai::Classifier;
use watchman_core::WatchmanConfig;
use watchman_store::{FileStore, KeyValueStore, LogStore, RosterStore};

/// A fully wired Watchman instance: durable stores, the classifier, and the
/// capture controller sharing them.
pub struct Watchman {
    pub roster: Arc<RosterStore>,
    pub log: Arc<LogStore>,
    pub controller: CaptureController,
}

impl Watchman {
    /// Open the stores under `config.data_dir` and build an idle controller
    /// around `camera` and a Gemini-backed classifier.
    pub fn open(config: &WatchmanConfig, camera: Arc<dyn CameraDevice>) -> anyhow::Result<Self> {
        let kv: Arc<dyn KeyValueStore> = Arc::new(
            FileStore::open(config.data_dir.clone())
                .with_context(|| format!("open data dir {}", config.data_dir.display()))?,
        );
        Self::with_store(config, kv, camera)
    }

    /// Same as [`open`](Self::open) over an arbitrary key-value backend.
    pub fn with_store(
        config: &WatchmanConfig,
        kv: Arc<dyn KeyValueStore>,
        camera: Arc<dyn CameraDevice>,
    ) -> anyhow::Result<Self> {
        config.validate().context("invalid configuration")?;
        let roster = Arc::new(RosterStore::open(kv.clone()).context("load roster")?);
        let log = Arc::new(
            LogStore::open_with_capacity(kv, config.log_capacity).context("load surveillance log")?,
        );
        let classifier = Arc::new(Classifier::from_config(config));
        let controller =
            CaptureController::new(camera, classifier, roster.clone(), log.clone(), config)?;

        info!(
            people = roster.len(),
            logs = log.len(),
            model = %config.model,
            "watchman ready"
        );
        Ok(Self {
            roster,
            log,
            controller,
        })
    }
}

/// Install a `fmt` subscriber for the process. Later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();
}
