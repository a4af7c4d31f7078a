//! Client for the hosted multimodal generation service (Google Gemini).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::encoder::EncodedImage;
use crate::error::ServiceError;
use crate::state::RequestKind;

/// Anything that can turn an image plus a task directive into text.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, image: &EncodedImage, directive: &str)
        -> Result<String, ServiceError>;

    async fn request_caption(&self, image: &EncodedImage) -> Result<String, ServiceError> {
        self.generate(image, RequestKind::Caption.directive()).await
    }

    async fn request_social_post(&self, image: &EncodedImage) -> Result<String, ServiceError> {
        self.generate(image, RequestKind::SocialPost.directive()).await
    }
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 2],
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    Image { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(
        &self,
        image: &EncodedImage,
        directive: &str,
    ) -> Result<String, ServiceError> {
        let payload = GenerateRequest {
            contents: [Content {
                parts: [
                    RequestPart::Text { text: directive },
                    RequestPart::Image {
                        inline_data: InlineData {
                            mime_type: &image.mime_type,
                            data: &image.data,
                        },
                    },
                ],
            }],
        };

        info!(model = %self.model, mime = %image.mime_type, "sending generation request");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(%status, body = %truncate_for_log(&body, 500), "generation response");

        if !status.is_success() {
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        parse_generated_text(&body)
    }
}

/// Pull the generated text out of a successful response body.
fn parse_generated_text(body: &str) -> Result<String, ServiceError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ServiceError::Blocked(reason));
    }

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(ServiceError::MalformedResponse(
            "no text in response".to_string(),
        ));
    }
    Ok(text.to_string())
}

/// The service's own error message when the body carries one, else the body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

fn truncate_for_log(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"A cat "},{"text":"on a sill."}]}}]}"#;
        assert_eq!(parse_generated_text(body).unwrap(), "A cat on a sill.");
    }

    #[test]
    fn blocked_prompt_is_reported() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(matches!(
            parse_generated_text(body),
            Err(ServiceError::Blocked(reason)) if reason == "SAFETY"
        ));
    }

    #[test]
    fn empty_candidates_are_malformed() {
        assert!(matches!(
            parse_generated_text(r#"{"candidates":[]}"#),
            Err(ServiceError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_generated_text("not json"),
            Err(ServiceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn error_message_prefers_service_envelope() {
        let body = r#"{"error":{"code":429,"message":"rate limited","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(api_error_message(body), "rate limited");
        assert_eq!(api_error_message(" upstream down \n"), "upstream down");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_for_log("héllo", 2), "hé");
        assert_eq!(truncate_for_log("hi", 10), "hi");
    }

    #[test]
    fn request_body_matches_service_shape() {
        let payload = GenerateRequest {
            contents: [Content {
                parts: [
                    RequestPart::Text { text: "describe" },
                    RequestPart::Image {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: "AAAA",
                        },
                    },
                ],
            }],
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({
                "contents": [{
                    "parts": [
                        { "text": "describe" },
                        { "inline_data": { "mime_type": "image/png", "data": "AAAA" } }
                    ]
                }]
            })
        );
    }
}
