//! Agent Gateway - typed request/response exchanges with the generative model
//!
//! Each stage agent packages a slice of the proposal into a prompt plus a
//! strict response schema, sends it through a [`ModelClient`], and decodes the
//! reply into a typed result. Anything that does not match the schema is a
//! [`GatewayError::SchemaMismatch`], never a partially filled record.

pub mod agents;
pub mod gemini;
pub mod prompts;
pub mod schema;

pub use agents::{ComplianceResult, Gateway, RedTeamResult};
pub use gemini::GeminiClient;

use crate::error::GatewayError;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// Which configured model a request should go to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Structured stage agents
    Reasoning,
    /// Conversational Q&A
    Fast,
}

/// One piece of request content
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Base64 payload with its MIME type
    InlineData { mime_type: String, data: String },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn pdf(base64: impl Into<String>) -> Self {
        Part::InlineData {
            mime_type: "application/pdf".to_string(),
            data: base64.into(),
        }
    }
}

/// A single generation request
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub tier: ModelTier,
    pub parts: Vec<Part>,
    /// JSON Schema the reply must satisfy; `None` accepts free text
    pub response_schema: Option<JsonValue>,
    /// Allow the model to ground answers with web search
    pub grounding: bool,
}

impl ModelRequest {
    pub fn structured(parts: Vec<Part>, schema: JsonValue) -> Self {
        Self {
            tier: ModelTier::Reasoning,
            parts,
            response_schema: Some(schema),
            grounding: false,
        }
    }

    pub fn free_text(tier: ModelTier, parts: Vec<Part>) -> Self {
        Self {
            tier,
            parts,
            response_schema: None,
            grounding: false,
        }
    }

    pub fn with_grounding(mut self) -> Self {
        self.grounding = true;
        self
    }

    /// Whether any part carries an attached document
    pub fn has_document(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, Part::InlineData { .. }))
    }
}

/// Black-box text generator: prompt (+ optional schema) in, text out
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<String, GatewayError>;
}
