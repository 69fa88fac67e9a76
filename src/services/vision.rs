use std::path::Path;

use base64::Engine;
use reqwest::Client;
use serde::Deserialize;

use crate::models::analysis::AnalysisResult;
use crate::services::normalizer::{self, NormalizerError};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

const ANALYSIS_PROMPT: &str = r#"You are an expert gym equipment analyzer. Analyze this image and identify:

1. Any asset tags, labels, barcodes, or identification codes on equipment
2. All gym equipment visible with their weights/specifications
3. Equipment condition if visible

Return a JSON response with this exact structure:
{
  "asset_tags": [
    {
      "tag": "asset_tag_text",
      "confidence": 0.95,
      "location_description": "where on the equipment"
    }
  ],
  "equipment": [
    {
      "type": "dumbbell/barbell_plate/kettlebell/medicine_ball/resistance_band/cable_attachment/bench/other",
      "weight": "25 lbs" or "unknown",
      "description": "detailed description",
      "condition": "excellent/good/fair/poor/unknown",
      "suggested_asset_tag": "suggested tag if no tag visible",
      "location_in_image": "description of location in image"
    }
  ],
  "image_quality": "excellent/good/fair/poor",
  "total_items": 0,
  "recommendations": "any suggestions for better detection"
}

Be thorough but concise. If you see multiple identical items (like a rack of dumbbells), list each separately.
For asset tags, look for any text/codes that could be used for tracking - stickers, engraved text, barcodes, etc.
For equipment, be specific about weights and types."#;

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("failed to read image file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Normalize(#[from] NormalizerError),

    #[error("vision model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("vision model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("no valid JSON in model reply: {raw}")]
    UnparsableReply { raw: String },
}

/// Seam between the orchestrator and the external vision model, so
/// pipeline tests can run against a stub instead of a live endpoint.
#[async_trait::async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Analyze the image at `path`. Exactly one outbound call per
    /// invocation; no retries on parse failure.
    async fn analyze(
        &self,
        path: &Path,
        asset_tag: Option<&str>,
    ) -> Result<AnalysisResult, VisionError>;
}

/// Client for the OpenAI chat-completions vision endpoint.
pub struct OpenAiVisionClient {
    http: Client,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiVisionClient {
    pub fn new(api_key: String, model: String) -> Self {
        // No explicit timeout: the transport default is a documented
        // limitation of this pipeline.
        Self {
            http: Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait::async_trait]
impl VisionAnalyzer for OpenAiVisionClient {
    async fn analyze(
        &self,
        path: &Path,
        asset_tag: Option<&str>,
    ) -> Result<AnalysisResult, VisionError> {
        let bytes = tokio::fs::read(path).await?;
        let jpeg = normalizer::normalize(&bytes)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&jpeg);

        tracing::debug!(
            image = %path.display(),
            asset_tag = asset_tag.unwrap_or("-"),
            payload_bytes = encoded.len(),
            "Sending image to vision model"
        );

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": ANALYSIS_PROMPT},
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:image/jpeg;base64,{}", encoded),
                            "detail": "high"
                        }
                    }
                ]
            }],
            "max_tokens": 1500,
            "temperature": 0.1
        });

        let response = self
            .http
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let payload: serde_json::Value = response.json().await.unwrap_or_default();
            let message = payload["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            return Err(VisionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .unwrap_or("");

        parse_model_reply(content)
    }
}

/// Parse the free-text model reply into a structured result.
///
/// Models wrap JSON in prose or code fences, so this takes the first
/// balanced `{...}` span instead of requiring a clean JSON body. A
/// missing or malformed span is returned as an error value carrying
/// the raw reply for diagnostics.
pub fn parse_model_reply(content: &str) -> Result<AnalysisResult, VisionError> {
    let span = extract_json_span(content).ok_or_else(|| VisionError::UnparsableReply {
        raw: content.to_string(),
    })?;

    serde_json::from_str(span).map_err(|_| VisionError::UnparsableReply {
        raw: content.to_string(),
    })
}

/// First balanced `{...}` span in `text`, brace-counting with JSON
/// string and escape awareness.
fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_balanced_span_from_prose() {
        let reply = "Here is the analysis:\n{\"image_quality\": \"good\"}\nLet me know!";
        assert_eq!(extract_json_span(reply), Some("{\"image_quality\": \"good\"}"));
    }

    #[test]
    fn handles_nested_objects() {
        let reply = r#"{"equipment": [{"type": "bench"}], "total_items": 1}"#;
        assert_eq!(extract_json_span(reply), Some(reply));
    }

    #[test]
    fn braces_inside_strings_do_not_unbalance() {
        let reply = r#"{"recommendations": "use {brackets} carefully"} trailing"#;
        assert_eq!(
            extract_json_span(reply),
            Some(r#"{"recommendations": "use {brackets} carefully"}"#)
        );
    }

    #[test]
    fn no_json_yields_none() {
        assert_eq!(extract_json_span("the model refused to answer"), None);
        assert_eq!(extract_json_span("unterminated { object"), None);
    }

    #[test]
    fn parse_carries_raw_reply_on_failure() {
        let raw = "I cannot identify any equipment in this image.";
        let err = parse_model_reply(raw).unwrap_err();
        match err {
            VisionError::UnparsableReply { raw: carried } => assert_eq!(carried, raw),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_accepts_code_fenced_reply() {
        let reply = "```json\n{\"image_quality\": \"fair\", \"equipment\": []}\n```";
        let result = parse_model_reply(reply).unwrap();
        assert_eq!(result.image_quality.as_deref(), Some("fair"));
        assert_eq!(result.equipment.as_ref().map(Vec::len), Some(0));
    }
}
