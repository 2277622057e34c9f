//! Natural-language questions about the current frame, answered by a
//! vision-language API.

mod client;
mod responder;

pub use client::{
    AssistantError, Unconfigured, VisionClient, VisionModel, VisionRequest, DEFAULT_BASE_URL,
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TIMEOUT, OPENAI_API_KEY_ENV,
};
pub use responder::{compose_prompt, QueryResponder, APOLOGY_MESSAGE, NO_IMAGE_MESSAGE};
