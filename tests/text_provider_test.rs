//! Integration tests for the text providers against mocked HTTP backends

use creditchat::config::{OllamaConfig, OpenAiConfig};
use creditchat::error::ProviderError;
use creditchat::providers::{GenerationProvider, OllamaProvider, OpenAiProvider};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ollama(server: &MockServer, timeout: Duration) -> OllamaProvider {
    let config = OllamaConfig {
        host: server.uri(),
        model: "llama3.2:latest".to_string(),
    };
    OllamaProvider::new(config, timeout).expect("ollama provider")
}

fn openai(server: &MockServer, api_key: Option<&str>) -> OpenAiProvider {
    let config = OpenAiConfig {
        api_base: server.uri(),
        api_key: api_key.map(str::to_string),
        model: "gemini-2.0-flash".to_string(),
    };
    OpenAiProvider::new(config, Duration::from_secs(5)).expect("openai provider")
}

#[tokio::test]
async fn test_ollama_sends_single_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama3.2:latest",
            "stream": false,
            "messages": [{ "role": "user", "content": "Hi" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": { "role": "assistant", "content": "Hello!" },
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = ollama(&server, Duration::from_secs(5))
        .generate("Hi")
        .await
        .expect("ollama reply");
    assert_eq!(reply.content, "Hello!");
}

#[tokio::test]
async fn test_ollama_server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let err = ollama(&server, Duration::from_secs(5))
        .generate("Hi")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unavailable(_)));
    assert!(err.to_string().contains("model not loaded"));
}

#[tokio::test]
async fn test_ollama_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(serde_json::json!({
                    "message": { "role": "assistant", "content": "late" },
                    "done": true
                })),
        )
        .mount(&server)
        .await;

    let err = ollama(&server, Duration::from_millis(200))
        .generate("Hi")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Timeout(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_openai_uses_bearer_key_and_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "first" } },
                { "message": { "role": "assistant", "content": "second" } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = openai(&server, Some("sk-test"))
        .generate("Hi")
        .await
        .expect("completion");
    assert_eq!(reply.content, "first");
}

#[tokio::test]
async fn test_openai_empty_choices_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = openai(&server, None).generate("Hi").await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_openai_bad_request_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid prompt"))
        .mount(&server)
        .await;

    let err = openai(&server, None).generate("").await.unwrap_err();
    assert!(matches!(err, ProviderError::Rejected(_)));
}
