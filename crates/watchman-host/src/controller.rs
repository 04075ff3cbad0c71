//! Capture loop controller.
//!
//! States: `Idle` (no video source), `Live` (source held, timer armed) and
//! `Analyzing` (one classification in flight, a sub-state of `Live`).
//!
//! - A single-permit semaphore gates entry into `Analyzing`. Timer ticks and
//!   manual triggers that find it taken are dropped, never queued.
//! - The timer task never awaits an analysis, so its cadence does not depend
//!   on how long the service takes.
//! - Every `start` opens a new session generation. An analysis that resolves
//!   after its session was stopped may only update the last-result display:
//!   it appends no log entry and schedules nothing.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use watchman_ai::FrameClassifier;
use watchman_core::{
    AnalysisResult, AnalysisStatus, ConfigError, FrameSettings, IdClock, SurveillanceLog,
    WatchmanConfig, display_now,
};
use watchman_store::{LogStore, RosterStore};

use crate::camera::{CameraAccessError, CameraDevice, FrameCaptureError, VideoSource};

/// Upper bound on one frame grab. The session lock is held while capturing,
/// so this also bounds how long `stop` can wait for the camera.
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

/// Controller lifecycle phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Live,
    Analyzing,
}

/// Snapshot of everything the dashboard displays about the capture loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerStatus {
    pub phase: Phase,
    /// Most recent classification result, including fallback results.
    pub last_result: Option<AnalysisResult>,
    /// Display time at which `last_result` arrived.
    pub last_result_at: Option<String>,
    /// Banner text from the last failed start; cleared by a successful start.
    pub camera_error: Option<String>,
}

impl ControllerStatus {
    pub fn is_live(&self) -> bool {
        matches!(self.phase, Phase::Live | Phase::Analyzing)
    }

    /// True while the latest judgement flags an unauthorized subject.
    pub fn alert(&self) -> bool {
        self.last_result
            .as_ref()
            .is_some_and(|r| r.status == AnalysisStatus::Unauthorized)
    }
}

/// What became of a capture trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The frame was classified.
    Completed(AnalysisResult),
    /// Another classification was already in flight.
    Busy,
    /// No live video source (or the trigger's session was stopped).
    NotLive,
    /// The source failed to produce a frame.
    CaptureFailed,
}

struct LiveSession {
    source: Box<dyn VideoSource>,
    ticker: JoinHandle<()>,
    generation: u64,
}

#[derive(Default)]
struct Session {
    live: Option<LiveSession>,
    generations: u64,
}

impl Session {
    fn is_current(&self, generation: u64) -> bool {
        self.live.as_ref().is_some_and(|l| l.generation == generation)
    }
}

struct Inner {
    camera: Arc<dyn CameraDevice>,
    classifier: Arc<dyn FrameClassifier>,
    roster: Arc<RosterStore>,
    log: Arc<LogStore>,
    settings: FrameSettings,
    interval: Duration,
    session: Mutex<Session>,
    analysis_gate: Arc<Semaphore>,
    status: watch::Sender<ControllerStatus>,
    log_ids: IdClock,
}

/// Owns the camera and the periodic capture → classify → log pipeline.
#[derive(Clone)]
pub struct CaptureController {
    inner: Arc<Inner>,
}

impl CaptureController {
    /// Create an idle controller. Interval and frame settings come from `config`,
    /// which must pass [`WatchmanConfig::validate`].
    pub fn new(
        camera: Arc<dyn CameraDevice>,
        classifier: Arc<dyn FrameClassifier>,
        roster: Arc<RosterStore>,
        log: Arc<LogStore>,
        config: &WatchmanConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (status, _) = watch::channel(ControllerStatus::default());
        Ok(Self {
            inner: Arc::new(Inner {
                camera,
                classifier,
                roster,
                log,
                settings: config.frame,
                interval: config.capture_interval(),
                session: Mutex::new(Session::default()),
                analysis_gate: Arc::new(Semaphore::new(1)),
                status,
                log_ids: IdClock::new(),
            }),
        })
    }

    /// Acquire the camera and arm the periodic timer.
    ///
    /// A no-op while already live. On failure the controller stays idle and
    /// the error's banner is published in [`ControllerStatus::camera_error`].
    pub async fn start(&self) -> Result<(), CameraAccessError> {
        let inner = &self.inner;
        let mut session = inner.session.lock().await;
        if session.live.is_some() {
            debug!("start ignored, camera already live");
            return Ok(());
        }

        let source = match inner.camera.open(inner.settings).await {
            Ok(source) => source,
            Err(e) => {
                warn!(error = %e, "camera access failed");
                inner.status.send_modify(|s| {
                    s.phase = Phase::Idle;
                    s.camera_error = Some(e.banner().to_string());
                });
                return Err(e);
            }
        };

        session.generations += 1;
        let generation = session.generations;
        let ticker = spawn_ticker(Arc::downgrade(inner), generation, inner.interval);
        session.live = Some(LiveSession {
            source,
            ticker,
            generation,
        });
        inner.status.send_modify(|s| {
            s.phase = Phase::Live;
            s.camera_error = None;
        });
        info!(
            generation,
            interval_secs = inner.interval.as_secs_f64(),
            "surveillance started"
        );
        Ok(())
    }

    /// Release the camera and cancel the timer. A no-op while idle.
    ///
    /// An analysis still in flight is left to finish, but loses its license
    /// to append log entries.
    pub async fn stop(&self) {
        let mut session = self.inner.session.lock().await;
        let Some(mut live) = session.live.take() else {
            return;
        };
        live.ticker.abort();
        live.source.release();
        self.inner.status.send_modify(|s| s.phase = Phase::Idle);
        info!(generation = live.generation, "surveillance stopped");
    }

    /// Manual snapshot scan. Same path and same gate as a timer tick.
    pub async fn capture_now(&self) -> TriggerOutcome {
        Inner::run_pipeline(&self.inner, None).await
    }

    /// Current status snapshot.
    pub fn status(&self) -> ControllerStatus {
        self.inner.status.borrow().clone()
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<ControllerStatus> {
        self.inner.status.subscribe()
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }
}

impl Inner {
    /// Capture, classify, publish, and log one frame.
    ///
    /// `expected` pins the run to a session generation (timer ticks); `None`
    /// accepts whichever session is live (manual triggers).
    async fn run_pipeline(inner: &Arc<Inner>, expected: Option<u64>) -> TriggerOutcome {
        let Ok(_permit) = Arc::clone(&inner.analysis_gate).try_acquire_owned() else {
            debug!("trigger dropped, analysis already in flight");
            return TriggerOutcome::Busy;
        };

        let (frame, generation) = {
            let mut session = inner.session.lock().await;
            let Some(live) = session.live.as_mut() else {
                return TriggerOutcome::NotLive;
            };
            if expected.is_some_and(|g| g != live.generation) {
                return TriggerOutcome::NotLive;
            }
            let generation = live.generation;
            inner.status.send_modify(|s| s.phase = Phase::Analyzing);
            let captured = tokio::time::timeout(CAPTURE_TIMEOUT, live.source.capture())
                .await
                .unwrap_or(Err(FrameCaptureError::Timeout(CAPTURE_TIMEOUT)));
            match captured {
                Ok(frame) => (frame, generation),
                Err(e) => {
                    warn!(error = %e, "frame capture failed");
                    inner.status.send_modify(|s| s.phase = Phase::Live);
                    return TriggerOutcome::CaptureFailed;
                }
            }
        };

        let roster = inner.roster.list();
        let result = inner.classifier.classify(&frame, &roster).await;

        let session = inner.session.lock().await;
        let current = session.is_current(generation);
        inner.status.send_modify(|s| {
            s.last_result = Some(result.clone());
            s.last_result_at = Some(display_now());
            if current {
                s.phase = Phase::Live;
            }
        });

        if !current {
            debug!(generation, "session ended during analysis, result not logged");
        } else if let Some(entry) =
            SurveillanceLog::from_detection(&result, inner.log_ids.next_id(), display_now())
        {
            info!(
                name = %entry.detected_name,
                status = entry.status.as_str(),
                "detection recorded"
            );
            if let Err(e) = inner.log.append(entry) {
                warn!(error = %e, "detection kept in memory but not persisted");
            }
        }
        drop(session);

        TriggerOutcome::Completed(result)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(mut live) = self.session.get_mut().live.take() {
            live.ticker.abort();
            live.source.release();
        }
    }
}

/// Fire every `period`, first after one full period, until the controller is
/// dropped or the task is aborted by `stop`.
fn spawn_ticker(inner: Weak<Inner>, generation: u64, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticks.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            debug!(generation, "capture tick");
            tokio::spawn(async move {
                Inner::run_pipeline(&inner, Some(generation)).await;
            });
        }
    })
}
