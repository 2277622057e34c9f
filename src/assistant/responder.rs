//! Answers questions about the last annotated frame.

use std::sync::Arc;

use super::client::{VisionModel, VisionRequest, DEFAULT_MAX_TOKENS};
use crate::encoding::jpeg_data_url;
use crate::observation::LastObservation;

/// Returned before any frame has been captured.
pub const NO_IMAGE_MESSAGE: &str = "Sorry, no image has been captured yet.";

/// Returned when the vision API call fails for any reason.
pub const APOLOGY_MESSAGE: &str = "Sorry, something went wrong. Please try again later.";

/// Text part of the request: the question plus the labels detected on the frame.
pub fn compose_prompt(question: &str, labels: &[String]) -> String {
    format!(
        "I have a question about this image: {}. Detected objects: {}",
        question,
        labels.join(", ")
    )
}

/// Query Responder.
///
/// Cheap to clone; every socket session holds one.
#[derive(Clone)]
pub struct QueryResponder {
    model: Arc<dyn VisionModel>,
    observation: Arc<LastObservation>,
    max_tokens: u32,
}

impl QueryResponder {
    pub fn new(model: Arc<dyn VisionModel>, observation: Arc<LastObservation>) -> Self {
        Self {
            model,
            observation,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Answer `question` about the most recent frame.
    ///
    /// Always yields user-facing text. Failures are logged and replaced by
    /// [`APOLOGY_MESSAGE`]; there is no retry.
    pub async fn answer(&self, question: &str) -> String {
        log::info!("Question received: {}", question);

        // One snapshot, so the image and labels come from the same frame
        let Some(observation) = self.observation.snapshot() else {
            return NO_IMAGE_MESSAGE.to_string();
        };

        let request = VisionRequest {
            prompt: compose_prompt(question, &observation.labels),
            image_url: jpeg_data_url(&observation.jpeg),
            max_tokens: self.max_tokens,
        };

        log::info!(
            "Sending frame {} to the vision API ({} label(s))",
            observation.sequence,
            observation.labels.len()
        );
        match self.model.complete(&request).await {
            Ok(answer) => answer,
            Err(e) => {
                log::error!("Vision API request failed: {}", e);
                APOLOGY_MESSAGE.to_string()
            }
        }
    }
}
