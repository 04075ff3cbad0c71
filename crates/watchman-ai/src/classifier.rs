//! Frame classification with a fail-closed-to-silence policy.
//!
//! [`Classifier`] wraps a [`JudgementService`] and guarantees a result for
//! every frame: any service failure, shape violation, or timeout becomes
//! [`AnalysisResult::fallback`], which carries `detected = false` and so can
//! never produce a log entry.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use watchman_core::config::DEFAULT_CLASSIFY_TIMEOUT_SECS;
use watchman_core::{AnalysisResult, AuthorizedPerson, Frame, WatchmanConfig};

use crate::ClassifyError;
use crate::gemini::GeminiClient;
use crate::prompt::build_instruction;

/// An external service that judges a single frame against an instruction.
#[async_trait]
pub trait JudgementService: Send + Sync {
    async fn judge(&self, instruction: &str, frame: &Frame)
    -> Result<AnalysisResult, ClassifyError>;
}

/// Classify a frame against the current roster. Infallible by contract.
#[async_trait]
pub trait FrameClassifier: Send + Sync {
    async fn classify(&self, frame: &Frame, roster: &[AuthorizedPerson]) -> AnalysisResult;
}

/// Bounded, fallback-on-error classifier over a [`JudgementService`].
pub struct Classifier<S> {
    service: S,
    timeout: Duration,
}

impl<S: JudgementService> Classifier<S> {
    pub fn new(service: S, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    pub fn with_default_timeout(service: S) -> Self {
        Self::new(service, Duration::from_secs(DEFAULT_CLASSIFY_TIMEOUT_SECS))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Same as [`FrameClassifier::classify`] but exposes the failure.
    pub async fn try_classify(
        &self,
        frame: &Frame,
        roster: &[AuthorizedPerson],
    ) -> Result<AnalysisResult, ClassifyError> {
        let instruction = build_instruction(roster);
        match tokio::time::timeout(self.timeout, self.service.judge(&instruction, frame)).await {
            Ok(result) => result,
            Err(_) => Err(ClassifyError::Timeout(self.timeout)),
        }
    }
}

impl Classifier<GeminiClient> {
    /// Gemini-backed classifier using endpoint, model, key and timeout from `config`.
    pub fn from_config(config: &WatchmanConfig) -> Self {
        Self::new(GeminiClient::from_config(config), config.classify_timeout())
    }
}

#[async_trait]
impl<S: JudgementService> FrameClassifier for Classifier<S> {
    async fn classify(&self, frame: &Frame, roster: &[AuthorizedPerson]) -> AnalysisResult {
        match self.try_classify(frame, roster).await {
            Ok(result) => {
                debug!(
                    detected = result.detected,
                    status = result.status.as_str(),
                    "frame classified"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "classification failed, using fallback result");
                AnalysisResult::fallback()
            }
        }
    }
}
