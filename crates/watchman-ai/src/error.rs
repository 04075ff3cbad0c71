use thiserror::Error;

/// Failure while obtaining a judgement from the classification service.
///
/// Never surfaced past [`Classifier`](crate::Classifier): every variant is
/// absorbed into [`AnalysisResult::fallback`](watchman_core::AnalysisResult::fallback).
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("service response carried no judgement text")]
    EmptyResponse,
    #[error("judgement did not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("classification timed out after {0:?}")]
    Timeout(std::time::Duration),
}
