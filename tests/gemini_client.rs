use image_captioner::encoder::EncodedImage;
use image_captioner::error::{GenerationError, ServiceError};
use image_captioner::{Config, GeminiClient, GenerationClient, RequestKind};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/models/test-model:generateContent";

fn client_for(server: &MockServer) -> GeminiClient {
    client_at(format!("{}/", server.uri()), "test-key")
}

fn client_at(api_base: String, api_key: &str) -> GeminiClient {
    let config = Config {
        api_key: api_key.into(),
        model: "test-model".into(),
        api_base,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        request_timeout_secs: 5,
        max_upload_bytes: 1024,
    };
    GeminiClient::new(&config).unwrap()
}

fn cat() -> EncodedImage {
    EncodedImage {
        data: "iVBORw0KGgo=".into(),
        mime_type: "image/png".into(),
    }
}

#[tokio::test]
async fn caption_request_carries_image_and_directive() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{
                "parts": [
                    { "text": RequestKind::Caption.directive() },
                    { "inline_data": { "mime_type": "image/png", "data": "iVBORw0KGgo=" } }
                ]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "A cat sitting on a windowsill." }] }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let caption = client_for(&server).request_caption(&cat()).await.unwrap();
    assert_eq!(caption, "A cat sitting on a windowsill.");
}

#[tokio::test]
async fn social_post_uses_its_own_directive() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": RequestKind::SocialPost.directive() }, {}] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Window seat vibes #cats" }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let post = client_for(&server).request_social_post(&cat()).await.unwrap();
    assert_eq!(post, "Window seat vibes #cats");
}

#[tokio::test]
async fn api_error_message_is_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "message": "rate limited", "status": "RESOURCE_EXHAUSTED" }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).request_caption(&cat()).await.unwrap_err();
    match err {
        ServiceError::Api { status, message } => {
            assert_eq!(status, 429);
            assert_eq!(message, "rate limited");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn blocked_prompt_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).request_caption(&cat()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Blocked(reason) if reason == "SAFETY"));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    // Nothing listens on port 1.
    let client = client_at("http://127.0.0.1:1".into(), "test-key");

    let err = client.request_caption(&cat()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Transport(_)));
}

#[tokio::test]
async fn api_key_never_appears_in_failure_messages() {
    let client = client_at("http://127.0.0.1:1".into(), "SUPER-SECRET-KEY");

    let err = client.request_caption(&cat()).await.unwrap_err();
    let debug = format!("{err:?}");
    let shown = GenerationError::from(err).display_message();

    assert!(shown.starts_with("Request to generation service failed"));
    assert!(!shown.contains("SUPER-SECRET-KEY"), "key leaked: {shown}");
    assert!(!debug.contains("SUPER-SECRET-KEY"), "key leaked: {debug}");
}

#[tokio::test]
async fn key_is_not_sent_in_the_query_string() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }]
        })))
        .mount(&server)
        .await;

    let text = client_for(&server).request_caption(&cat()).await.unwrap();
    assert_eq!(text, "ok");
}
