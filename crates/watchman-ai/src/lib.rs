//! Frame classification: prompt construction, the Gemini vision client, and
//! the fallback-on-error classifier the capture loop depends on.

mod error;
pub use error::ClassifyError;

pub mod classifier;
pub use classifier::{Classifier, FrameClassifier, JudgementService};

pub mod gemini;
pub use gemini::GeminiClient;

pub mod prompt;
pub use prompt::{build_instruction, response_schema};
