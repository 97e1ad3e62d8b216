//! Gemini implementation of the CardExtractor trait.
//!
//! Sends one `generateContent` request per image with a response schema
//! that pins the output to the five card fields.
//!
//! # Example
//!
//! ```rust,ignore
//! use card_ingest::ai::GeminiExtractor;
//! use card_ingest::security::ExtractorCredentials;
//!
//! let extractor = GeminiExtractor::new(ExtractorCredentials::new("AIza..."))?;
//! let pipeline = CardIngestionPipeline::new(extractor, assets, catalog);
//! ```

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ExtractionFailure;
use crate::pipeline::prompts::{
    extraction_schema, EXTRACTION_INSTRUCTION, EXTRACTION_PROMPT, REQUIRED_FIELDS,
};
use crate::security::ExtractorCredentials;
use crate::traits::extractor::{CardExtractor, Extracted};
use crate::types::card::{CardInfo, CardType, Rarity};

/// Upper bound for one extraction request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How much of an error body is kept in failure details.
const DETAIL_LIMIT: usize = 500;

/// Gemini-based card extractor.
#[derive(Clone)]
pub struct GeminiExtractor {
    client: Client,
    credentials: ExtractorCredentials,
}

impl GeminiExtractor {
    /// Create a client. Fails with `MissingCredentials` when the key is empty.
    pub fn new(credentials: ExtractorCredentials) -> Result<Self, ExtractionFailure> {
        if !credentials.has_api_key() {
            return Err(ExtractionFailure::MissingCredentials);
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ExtractionFailure::Transport(e.to_string()))?;

        Ok(Self {
            client,
            credentials,
        })
    }

    /// Get the current model name.
    pub fn model(&self) -> &str {
        &self.credentials.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.credentials.base_url, self.credentials.model
        )
    }
}

#[async_trait]
impl CardExtractor for GeminiExtractor {
    async fn extract(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<Extracted, ExtractionFailure> {
        debug!(
            "Calling {} ({} bytes, {})",
            self.credentials.model,
            image.len(),
            mime_type
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.credentials.api_key.expose())
            .json(&request_body(image, mime_type))
            .send()
            .await
            .map_err(|e| ExtractionFailure::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ExtractionFailure::Transport(e.to_string()))?;

        debug!("Gemini responded with {}", status);
        interpret_response(status, &body)
    }
}

/// Build the `generateContent` request for one image.
pub fn request_body(image: &[u8], mime_type: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "text": EXTRACTION_PROMPT },
                { "inlineData": { "mimeType": mime_type, "data": STANDARD.encode(image) } }
            ]
        }],
        "systemInstruction": {
            "parts": [{ "text": EXTRACTION_INSTRUCTION }]
        },
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": extraction_schema(),
            "temperature": 0.1
        }
    })
}

/// Classify an HTTP response from `generateContent`.
pub fn interpret_response(status: u16, body: &str) -> Result<Extracted, ExtractionFailure> {
    match status {
        200 => interpret_success(body),
        400 if body.contains("API key not valid") => Err(ExtractionFailure::InvalidCredentials),
        401 | 403 => Err(ExtractionFailure::InvalidCredentials),
        400 => Err(ExtractionFailure::BadRequest {
            detail: truncate(body),
        }),
        429 => Err(ExtractionFailure::QuotaExceeded),
        _ => {
            warn!("Unexpected Gemini status {}", status);
            Err(ExtractionFailure::Server {
                status,
                detail: truncate(body),
            })
        }
    }
}

fn interpret_success(body: &str) -> Result<Extracted, ExtractionFailure> {
    let envelope: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        if body.contains("API key not valid") {
            ExtractionFailure::InvalidCredentials
        } else {
            ExtractionFailure::Malformed(format!("response envelope: {}", e))
        }
    })?;

    if let Some(reason) = envelope.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ExtractionFailure::Blocked { reason });
    }

    let candidate = envelope
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ExtractionFailure::Malformed("no candidates".into()))?;

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(ExtractionFailure::Blocked {
            reason: "SAFETY".into(),
        });
    }

    let text = candidate
        .content
        .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        .ok_or_else(|| ExtractionFailure::Malformed("candidate has no text".into()))?;

    parse_card_fields(&text)
}

/// Turn the model's JSON text into card metadata.
///
/// Absent, empty, or out-of-vocabulary mandatory fields count as missing.
pub fn parse_card_fields(text: &str) -> Result<Extracted, ExtractionFailure> {
    let fields: CardFields = serde_json::from_str(text)
        .map_err(|e| ExtractionFailure::Malformed(format!("card JSON: {}", e)))?;

    let rarity = non_empty(&fields.rarity).and_then(|r| r.parse::<Rarity>().ok());
    let card_type = non_empty(&fields.card_type).and_then(CardType::from_label);
    let card_id = non_empty(&fields.card_id);

    let (Some(rarity), Some(card_type), Some(card_id)) = (rarity, card_type, card_id) else {
        let present = [rarity.is_some(), card_type.is_some(), card_id.is_some()];
        let missing = REQUIRED_FIELDS
            .iter()
            .zip(present)
            .filter(|(_, ok)| !ok)
            .map(|(name, _)| *name);
        return Ok(Extracted::incomplete(missing));
    };

    let mut card = CardInfo::new(rarity, card_type, card_id);
    card.card_name = non_empty(&fields.card_name).map(str::to_string);
    card.character_name = non_empty(&fields.character_name).map(str::to_string);
    Ok(Extracted::Card(card))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn truncate(body: &str) -> String {
    body.chars().take(DETAIL_LIMIT).collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardFields {
    rarity: Option<String>,
    card_type: Option<String>,
    card_id: Option<String>,
    card_name: Option<String>,
    character_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(text: &str) -> String {
        json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }], "role": "model" },
                "finishReason": "STOP"
            }]
        })
        .to_string()
    }

    #[test]
    fn test_builder_requires_key() {
        assert!(matches!(
            GeminiExtractor::new(ExtractorCredentials::new("")),
            Err(ExtractionFailure::MissingCredentials)
        ));

        let extractor = GeminiExtractor::new(
            ExtractorCredentials::new("AIza-test")
                .with_model("gemini-1.5-pro")
                .with_base_url("https://custom.api.com/v1beta"),
        )
        .unwrap();
        assert_eq!(extractor.model(), "gemini-1.5-pro");
        assert_eq!(
            extractor.endpoint(),
            "https://custom.api.com/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = request_body(b"\x89PNG", "image/png");

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], EXTRACTION_PROMPT);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], STANDARD.encode(b"\x89PNG"));
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            EXTRACTION_INSTRUCTION
        );
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["responseSchema"]["required"],
            json!(["rarity", "cardType", "cardId"])
        );
    }

    #[test]
    fn test_complete_card() {
        let text = json!({
            "rarity": "N",
            "cardType": "サポート",
            "cardId": "IMT-01-069",
            "cardName": "ライブサポート",
            "characterName": "如月千早"
        })
        .to_string();

        let card = interpret_response(200, &envelope(&text))
            .unwrap()
            .into_card()
            .unwrap();

        assert_eq!(card.rarity, Rarity::N);
        assert_eq!(card.card_type, CardType::Support);
        assert_eq!(card.card_id, "IMT-01-069");
        assert_eq!(card.card_name.as_deref(), Some("ライブサポート"));
        assert_eq!(card.character_name.as_deref(), Some("如月千早"));
    }

    #[test]
    fn test_missing_and_empty_fields_are_incomplete() {
        let text = json!({ "rarity": "SR", "cardType": "", "cardName": "x" }).to_string();

        assert_eq!(
            interpret_response(200, &envelope(&text)).unwrap(),
            Extracted::incomplete(["cardType", "cardId"])
        );
    }

    #[test]
    fn test_unknown_rarity_counts_as_missing() {
        let text = json!({ "rarity": "UR", "cardType": "コスチューム", "cardId": "IMT-01-001" })
            .to_string();

        assert_eq!(
            parse_card_fields(&text).unwrap(),
            Extracted::incomplete(["rarity"])
        );
    }

    #[test]
    fn test_optional_fields_may_be_blank() {
        let text = json!({
            "rarity": "SSR",
            "cardType": "SPアピール",
            "cardId": "IMT-02-010",
            "cardName": "  "
        })
        .to_string();

        let card = parse_card_fields(&text).unwrap().into_card().unwrap();
        assert_eq!(card.card_type, CardType::SpecialAppeal);
        assert!(card.card_name.is_none());
        assert!(card.character_name.is_none());
    }

    #[test]
    fn test_blocked_responses() {
        let prompt_blocked = json!({ "promptFeedback": { "blockReason": "OTHER" } }).to_string();
        assert_eq!(
            interpret_response(200, &prompt_blocked),
            Err(ExtractionFailure::Blocked {
                reason: "OTHER".into()
            })
        );

        let safety = json!({ "candidates": [{ "finishReason": "SAFETY" }] }).to_string();
        assert_eq!(
            interpret_response(200, &safety),
            Err(ExtractionFailure::Blocked {
                reason: "SAFETY".into()
            })
        );
    }

    #[test]
    fn test_malformed_responses() {
        assert!(matches!(
            interpret_response(200, "not json"),
            Err(ExtractionFailure::Malformed(_))
        ));
        assert!(matches!(
            interpret_response(200, "{}"),
            Err(ExtractionFailure::Malformed(_))
        ));
        assert!(matches!(
            interpret_response(200, &envelope("the card says IMT-01-001")),
            Err(ExtractionFailure::Malformed(_))
        ));
    }

    #[test]
    fn test_http_status_classification() {
        assert_eq!(
            interpret_response(400, r#"{"error":{"message":"API key not valid. Please pass a valid API key."}}"#),
            Err(ExtractionFailure::InvalidCredentials)
        );
        assert_eq!(
            interpret_response(403, "forbidden"),
            Err(ExtractionFailure::InvalidCredentials)
        );
        assert!(matches!(
            interpret_response(400, "bad image"),
            Err(ExtractionFailure::BadRequest { .. })
        ));
        assert_eq!(
            interpret_response(429, "slow down"),
            Err(ExtractionFailure::QuotaExceeded)
        );
        assert!(matches!(
            interpret_response(503, "unavailable"),
            Err(ExtractionFailure::Server { status: 503, .. })
        ));
        assert!(matches!(
            interpret_response(404, "no such model"),
            Err(ExtractionFailure::Server { status: 404, .. })
        ));
    }

    #[test]
    fn test_error_detail_is_truncated() {
        let body = "x".repeat(2000);
        match interpret_response(500, &body) {
            Err(ExtractionFailure::Server { detail, .. }) => assert_eq!(detail.len(), DETAIL_LIMIT),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_failure() {
        let extractor = GeminiExtractor::new(
            ExtractorCredentials::new("AIza-test").with_base_url("http://127.0.0.1:9"),
        )
        .unwrap();

        assert!(matches!(
            extractor.extract(b"img", "image/jpeg").await,
            Err(ExtractionFailure::Transport(_))
        ));
    }
}
