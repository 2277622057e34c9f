//! VisionClient against a mock chat completions server.

use std::time::Duration;

use lookout::assistant::{
    AssistantError, VisionClient, VisionModel, VisionRequest, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> VisionRequest {
    VisionRequest {
        prompt: "I have a question about this image: What is this?. Detected objects: cup"
            .to_string(),
        image_url: "data:image/jpeg;base64,/9j/".to_string(),
        max_tokens: 300,
    }
}

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

// === Client Creation Tests ===

#[test]
fn test_with_api_key_uses_defaults() {
    let client = VisionClient::with_api_key("sk-test".to_string()).unwrap();
    assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    assert_eq!(client.model(), DEFAULT_MODEL);
}

#[test]
fn test_with_options_rejects_empty_key() {
    let result = VisionClient::with_options(
        String::new(),
        "http://localhost".to_string(),
        "m".to_string(),
        Duration::from_secs(1),
    );
    assert!(matches!(result, Err(AssistantError::MissingApiKey)));
}

// === Mock HTTP Server Tests ===

#[tokio::test]
async fn test_sends_question_and_image_in_one_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_json(serde_json::json!({
            "model": "gpt-4o",
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "I have a question about this image: What is this?. Detected objects: cup"},
                    {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,/9j/"}}
                ]
            }],
            "max_tokens": 300
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("A white cup.")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = VisionClient::with_base_url("sk-test".to_string(), mock_server.uri()).unwrap();
    let answer = client.complete(&request()).await.unwrap();
    assert_eq!(answer, "A white cup.");
}

#[tokio::test]
async fn test_custom_model_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(wiremock::matchers::body_partial_json(
            serde_json::json!({"model": "local-vlm"}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = VisionClient::with_options(
        "sk-test".to_string(),
        format!("{}/v1", mock_server.uri()),
        "local-vlm".to_string(),
        Duration::from_secs(5),
    )
    .unwrap();
    assert_eq!(client.complete(&request()).await.unwrap(), "ok");
}

#[tokio::test]
async fn test_rate_limit_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_string("quota exceeded"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = VisionClient::with_base_url("sk-test".to_string(), mock_server.uri()).unwrap();
    match client.complete(&request()).await {
        Err(AssistantError::RateLimit {
            message,
            retry_after_secs,
        }) => {
            assert_eq!(message, "quota exceeded");
            assert_eq!(retry_after_secs, Some(7));
        }
        other => panic!("expected RateLimit, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_becomes_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = VisionClient::with_base_url("sk-test".to_string(), mock_server.uri()).unwrap();
    let err = client.complete(&request()).await.unwrap_err();
    assert!(matches!(err, AssistantError::ApiError(ref m) if m.contains("upstream down")));
}

#[tokio::test]
async fn test_empty_choices_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
        .mount(&mock_server)
        .await;

    let client = VisionClient::with_base_url("sk-test".to_string(), mock_server.uri()).unwrap();
    assert!(matches!(
        client.complete(&request()).await,
        Err(AssistantError::EmptyResponse)
    ));
}

#[tokio::test]
async fn test_malformed_body_is_http_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let client = VisionClient::with_base_url("sk-test".to_string(), mock_server.uri()).unwrap();
    assert!(matches!(
        client.complete(&request()).await,
        Err(AssistantError::HttpError(_))
    ));
}
