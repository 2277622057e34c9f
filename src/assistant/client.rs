//! VisionClient - talks to an OpenAI-compatible chat completions API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The environment variable name for the API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default base URL for the chat completions API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default vision-capable model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default cap on answer length, in tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 300;

/// Default timeout for a completion request (60 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP status code for rate limiting.
const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// One question about one image.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionRequest {
    /// Text part of the message
    pub prompt: String,
    /// Image as a `data:` URL or a public URL
    pub image_url: String,
    /// Upper bound on the reply length
    pub max_tokens: u32,
}

/// A vision-language model that answers a text+image message.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn complete(&self, request: &VisionRequest) -> Result<String, AssistantError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Parse the `Retry-After` header, in seconds.
fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

/// Client for the chat completions endpoint.
#[derive(Debug, Clone)]
pub struct VisionClient {
    api_key: String,
    base_url: String,
    model: String,
    http_client: reqwest::Client,
}

impl VisionClient {
    /// Create a client with an explicit API key and default endpoint.
    pub fn with_api_key(api_key: String) -> Result<Self, AssistantError> {
        Self::with_options(
            api_key,
            DEFAULT_BASE_URL.to_string(),
            DEFAULT_MODEL.to_string(),
            DEFAULT_TIMEOUT,
        )
    }

    /// Create a client against a custom base URL. Useful for a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, AssistantError> {
        Self::with_options(api_key, base_url, DEFAULT_MODEL.to_string(), DEFAULT_TIMEOUT)
    }

    /// Create a client with every knob set.
    pub fn with_options(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, AssistantError> {
        if api_key.is_empty() {
            return Err(AssistantError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            http_client,
        })
    }

    /// Get the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full URL of the completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Send one completion request.
    ///
    /// # Errors
    ///
    /// `RateLimit` on HTTP 429 (never retried), `ApiError` on any other
    /// non-success status, `EmptyResponse` when the reply has no text, or
    /// `HttpError` if the request itself fails.
    pub async fn create_completion(&self, request: &VisionRequest) -> Result<String, AssistantError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: &request.prompt,
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: &request.image_url,
                        },
                    },
                ],
            }],
            max_tokens: request.max_tokens,
        };

        let response = self
            .http_client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();

            if status.as_u16() == HTTP_STATUS_TOO_MANY_REQUESTS {
                let retry_after_secs = parse_retry_after(&response);
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Rate limit exceeded".to_string());
                log::warn!(
                    "Rate limited by vision API. Retry-After: {:?} seconds",
                    retry_after_secs
                );
                return Err(AssistantError::RateLimit {
                    message: error_text,
                    retry_after_secs,
                });
            }

            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AssistantError::ApiError(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AssistantError::EmptyResponse)
    }
}

#[async_trait]
impl VisionModel for VisionClient {
    async fn complete(&self, request: &VisionRequest) -> Result<String, AssistantError> {
        self.create_completion(request).await
    }
}

/// Stand-in used when no API key is configured. Every call fails, so each
/// question gets the apology message while the stream keeps running.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

#[async_trait]
impl VisionModel for Unconfigured {
    async fn complete(&self, _request: &VisionRequest) -> Result<String, AssistantError> {
        Err(AssistantError::MissingApiKey)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("API key not configured (set OPENAI_API_KEY)")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited: {message}")]
    RateLimit {
        /// Body of the 429 response
        message: String,
        /// Retry-After header value in seconds, if provided
        retry_after_secs: Option<u64>,
    },

    #[error("Response contained no answer")]
    EmptyResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_api_key_creates_client() {
        let client = VisionClient::with_api_key("test-api-key".to_string()).unwrap();
        assert_eq!(client.api_key(), "test-api-key");
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_with_api_key_empty_returns_error() {
        let result = VisionClient::with_api_key(String::new());
        assert!(matches!(result, Err(AssistantError::MissingApiKey)));
    }

    #[test]
    fn test_completions_url_strips_trailing_slash() {
        let client =
            VisionClient::with_base_url("k".to_string(), "http://localhost:9/v1/".to_string())
                .unwrap();
        assert_eq!(client.completions_url(), "http://localhost:9/v1/chat/completions");
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "gpt-4o",
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: "hi" },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: "data:image/jpeg;base64,AA==",
                        },
                    },
                ],
            }],
            max_tokens: 300,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-4o",
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "hi"},
                        {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,AA=="}}
                    ]
                }],
                "max_tokens": 300
            })
        );
    }

    #[test]
    fn test_rate_limit_error_display() {
        let err = AssistantError::RateLimit {
            message: "slow down".to_string(),
            retry_after_secs: Some(3),
        };
        assert_eq!(err.to_string(), "Rate limited: slow down");
    }

    #[tokio::test]
    async fn test_unconfigured_always_fails() {
        let request = VisionRequest {
            prompt: "q".to_string(),
            image_url: String::new(),
            max_tokens: 1,
        };
        assert!(matches!(
            Unconfigured.complete(&request).await,
            Err(AssistantError::MissingApiKey)
        ));
    }
}
