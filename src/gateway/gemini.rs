//! Google Gemini REST client
//!
//! Sends `generateContent` requests with optional inline PDF data, a response
//! schema (JSON mode), and the Google Search grounding tool.

use super::{ModelClient, ModelRequest, ModelTier, Part};
use crate::error::GatewayError;
use crate::models::GeminiConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::time::Duration;
use tracing::{debug, error, info};

/// Schema keywords the Gemini API understands
const SCHEMA_KEYWORDS: &[&str] = &[
    "type",
    "description",
    "enum",
    "properties",
    "items",
    "required",
    "format",
    "nullable",
    "minimum",
    "maximum",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<JsonValue>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
}

/// Convert a JSON Schema into Gemini's schema dialect (upper-case types, known keywords only)
pub fn to_gemini_schema(schema: &JsonValue) -> JsonValue {
    match schema {
        JsonValue::Object(map) => {
            let mut out = Map::new();
            for (key, value) in map {
                if !SCHEMA_KEYWORDS.contains(&key.as_str()) {
                    continue;
                }
                let converted = match key.as_str() {
                    "type" => match value.as_str() {
                        Some(t) => JsonValue::String(t.to_uppercase()),
                        None => value.clone(),
                    },
                    "properties" => match value.as_object() {
                        Some(props) => JsonValue::Object(
                            props
                                .iter()
                                .map(|(name, prop)| (name.clone(), to_gemini_schema(prop)))
                                .collect(),
                        ),
                        None => value.clone(),
                    },
                    "items" => to_gemini_schema(value),
                    _ => value.clone(),
                };
                out.insert(key.clone(), converted);
            }
            JsonValue::Object(out)
        }
        other => other.clone(),
    }
}

/// Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    api_key: String,
    client: Client,
}

impl GeminiClient {
    /// Create a client, reading the API key from the configured environment variable
    pub fn from_config(config: GeminiConfig) -> Result<Self, GatewayError> {
        let api_key = config
            .api_key()
            .ok_or_else(|| GatewayError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, api_key)
    }

    pub fn new(config: GeminiConfig, api_key: impl Into<String>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            api_key: api_key.into(),
            client,
        })
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Reasoning => &self.config.model,
            ModelTier::Fast => &self.config.chat_model,
        }
    }

    fn build_body(&self, request: &ModelRequest) -> GenerateRequest {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => RequestPart::Text { text: text.clone() },
                Part::InlineData { mime_type, data } => RequestPart::Inline {
                    inline_data: InlineData {
                        mime_type: mime_type.clone(),
                        data: data.clone(),
                    },
                },
            })
            .collect();

        let generation_config = GenerationConfig {
            response_mime_type: request
                .response_schema
                .as_ref()
                .map(|_| "application/json".to_string()),
            response_schema: request.response_schema.as_ref().map(to_gemini_schema),
            temperature: self.config.temperature,
        };

        let tools = if request.grounding {
            vec![serde_json::json!({ "googleSearch": {} })]
        } else {
            Vec::new()
        };

        GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: Some(generation_config),
            tools,
        }
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, request: &ModelRequest) -> Result<String, GatewayError> {
        let model = self.model_for(request.tier);
        let url = format!("{}/{}:generateContent", self.config.base_url, model);

        debug!(
            %url,
            schema = request.response_schema.is_some(),
            document = request.has_document(),
            grounding = request.grounding,
            "sending Gemini request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_body(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(status = status.as_u16(), "Gemini API error");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)?;

        if let Some(usage) = &parsed.usage_metadata {
            info!(
                model,
                prompt_tokens = ?usage.prompt_token_count,
                response_tokens = ?usage.candidates_token_count,
                "Gemini usage"
            );
        }

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GatewayError::EmptyResponse);
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::schema;

    fn test_client() -> GeminiClient {
        GeminiClient::new(GeminiConfig::default(), "test-key").unwrap()
    }

    #[test]
    fn test_schema_conversion_uppercases_types() {
        let converted = to_gemini_schema(&schema::budget_schema());
        assert_eq!(converted["type"], "ARRAY");
        assert_eq!(converted["items"]["type"], "OBJECT");
        assert_eq!(converted["items"]["properties"]["amount"]["type"], "NUMBER");
        assert_eq!(converted["items"]["properties"]["amount"]["minimum"], 0);
    }

    #[test]
    fn test_schema_conversion_drops_unknown_keywords() {
        let input = serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": { "a": { "type": "string", "pattern": "x+" } }
        });
        let converted = to_gemini_schema(&input);
        assert!(converted.get("additionalProperties").is_none());
        assert!(converted["properties"]["a"].get("pattern").is_none());
    }

    #[test]
    fn test_request_body_with_document_and_schema() {
        let client = test_client();
        let request = ModelRequest::structured(
            vec![Part::text("analyze"), Part::pdf("JVBERi0=")],
            schema::compliance_schema(),
        );
        let body = serde_json::to_value(client.build_body(&request)).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "analyze");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[1]["inlineData"]["data"], "JVBERi0=");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_free_text_grounded_request_body() {
        let client = test_client();
        let request =
            ModelRequest::free_text(ModelTier::Fast, vec![Part::text("question")]).with_grounding();
        let body = serde_json::to_value(client.build_body(&request)).unwrap();

        assert!(body["generationConfig"].get("responseMimeType").is_none());
        assert!(body["tools"][0].get("googleSearch").is_some());
        assert_eq!(client.model_for(ModelTier::Fast), "gemini-2.5-flash");
    }

    #[test]
    fn test_missing_api_key() {
        let mut config = GeminiConfig::default();
        config.api_key_env = "GRANT_FACTORY_TEST_UNSET_KEY".to_string();
        let err = GeminiClient::from_config(config).unwrap_err();
        assert!(matches!(err, GatewayError::MissingApiKey(_)));
    }
}
