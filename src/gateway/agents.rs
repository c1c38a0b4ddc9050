use super::{prompts, schema, ModelClient, ModelRequest, ModelTier, Part};
use crate::error::GatewayError;
use crate::models::{
    BudgetItem, ComplianceCheck, Decision, LogicModel, ProposalState, RedTeamFix, ScoringMap,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Compliance agent reply
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ComplianceResult {
    pub decision: Decision,
    pub rationale: String,
    pub checks: Vec<ComplianceCheck>,
}

/// Red-team agent reply
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedTeamResult {
    pub estimated_score: f64,
    pub fixes: Vec<RedTeamFix>,
    #[serde(default)]
    pub readiness_verdict: Option<String>,
}

fn non_empty(value: &str) -> bool {
    !value.trim().is_empty()
}

/// One typed operation per stage agent, plus free-form Q&A
#[derive(Clone)]
pub struct Gateway {
    client: Arc<dyn ModelClient>,
}

impl Gateway {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }

    /// Compliance check and Go/No-Go decision from solicitation text and/or PDF
    pub async fn evaluate_compliance(
        &self,
        nofo_text: &str,
        org_profile: &str,
        pdf_base64: Option<&str>,
    ) -> Result<ComplianceResult, GatewayError> {
        if !non_empty(nofo_text) && pdf_base64.is_none() {
            return Err(GatewayError::MissingInput("solicitation text or PDF"));
        }

        let mut parts = vec![Part::text(prompts::compliance_prompt(org_profile))];
        if non_empty(nofo_text) {
            parts.push(Part::text(prompts::solicitation_part(
                "SOLICITATION TEXT",
                nofo_text,
            )));
        }
        if let Some(pdf) = pdf_base64 {
            parts.push(Part::pdf(pdf));
        }

        let schema = schema::compliance_schema();
        let raw = self
            .client
            .generate(&ModelRequest::structured(parts, schema.clone()))
            .await?;
        let result: ComplianceResult = schema::decode(&raw, &schema)?;

        info!(decision = %result.decision, checks = result.checks.len(), "compliance evaluated");
        Ok(result)
    }

    /// Scoring map and logic model from solicitation text and/or PDF
    pub async fn generate_architecture(
        &self,
        nofo_text: &str,
        pdf_base64: Option<&str>,
    ) -> Result<ScoringMap, GatewayError> {
        if !non_empty(nofo_text) && pdf_base64.is_none() {
            return Err(GatewayError::MissingInput("solicitation text or PDF"));
        }

        let mut parts = vec![Part::text(prompts::architecture_prompt())];
        if non_empty(nofo_text) {
            parts.push(Part::text(prompts::solicitation_part("NOFO TEXT", nofo_text)));
        }
        if let Some(pdf) = pdf_base64 {
            parts.push(Part::pdf(pdf));
        }

        let schema = schema::architecture_schema();
        let raw = self
            .client
            .generate(&ModelRequest::structured(parts, schema.clone()))
            .await?;
        let map: ScoringMap = schema::decode(&raw, &schema)?;

        info!(sections = map.sections.len(), total_points = map.total_points, "architecture generated");
        Ok(map)
    }

    /// Prose for one narrative section
    pub async fn draft_section(
        &self,
        section: &str,
        org_profile: &str,
        scoring_map: Option<&ScoringMap>,
    ) -> Result<String, GatewayError> {
        if !non_empty(section) {
            return Err(GatewayError::MissingInput("section name"));
        }

        let prompt = prompts::narrative_prompt(section, org_profile, scoring_map);
        let request = ModelRequest::free_text(ModelTier::Reasoning, vec![Part::text(prompt)]);
        let text = self.client.generate(&request).await?;
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(GatewayError::EmptyResponse);
        }

        info!(section, chars = text.len(), "section drafted");
        Ok(text)
    }

    /// Budget line items derived from the logic model
    pub async fn generate_budget(
        &self,
        nofo_text: &str,
        logic_model: Option<&LogicModel>,
    ) -> Result<Vec<BudgetItem>, GatewayError> {
        let Some(logic_model) = logic_model else {
            return Err(GatewayError::MissingInput("scoring map logic model"));
        };

        let prompt = prompts::budget_prompt(nofo_text, logic_model);
        let schema = schema::budget_schema();
        let raw = self
            .client
            .generate(&ModelRequest::structured(vec![Part::text(prompt)], schema.clone()))
            .await?;
        let items: Vec<BudgetItem> = schema::decode(&raw, &schema)?;

        info!(items = items.len(), "budget generated");
        Ok(items)
    }

    /// Simulated peer review of the full proposal
    pub async fn run_red_team(&self, proposal: &ProposalState) -> Result<RedTeamResult, GatewayError> {
        let prompt = prompts::red_team_prompt(proposal);
        let schema = schema::red_team_schema();
        let raw = self
            .client
            .generate(&ModelRequest::structured(vec![Part::text(prompt)], schema.clone()))
            .await?;
        let review: RedTeamResult = schema::decode(&raw, &schema)?;

        info!(score = review.estimated_score, fixes = review.fixes.len(), "red team review finished");
        Ok(review)
    }

    /// Free-form question answered with search grounding
    pub async fn ask(&self, question: &str, proposal: &ProposalState) -> Result<String, GatewayError> {
        if !non_empty(question) {
            return Err(GatewayError::MissingInput("question"));
        }

        let prompt = prompts::chat_prompt(question, proposal);
        let request =
            ModelRequest::free_text(ModelTier::Fast, vec![Part::text(prompt)]).with_grounding();
        let answer = self.client.generate(&request).await?;
        Ok(answer.trim().to_string())
    }
}
