use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Organization profile used when nothing has been entered yet
pub const DEFAULT_ORG_PROFILE: &str = "Renewable Dynamics: 45 FTEs, $12M revenue, UEI J4KHBR9LKE75. Specialized in solar-to-hydrogen conversion tech.";

/// Go/No-Go outcome of the compliance stage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Decision {
    #[serde(rename = "GO")]
    Go,
    #[serde(rename = "NO-GO", alias = "NO_GO", alias = "NOGO")]
    NoGo,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Go => "GO",
            Decision::NoGo => "NO-GO",
        }
    }

    pub fn is_go(&self) -> bool {
        matches!(self, Decision::Go)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warning,
}

/// One row of the eligibility & compliance matrix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceCheck {
    pub item: String,
    pub status: CheckStatus,
    pub blocking: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal_flaw: Option<bool>,
}

/// Evaluation section with its point weight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringSection {
    pub name: String,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub subsections: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LogicModel {
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub outcomes: Vec<String>,
}

impl LogicModel {
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
            && self.activities.is_empty()
            && self.outputs.is_empty()
            && self.outcomes.is_empty()
    }
}

/// Point-weighted outline of the solicitation's evaluation criteria.
///
/// Reference data for narrative drafting and budget generation once generated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoringMap {
    #[serde(default)]
    pub sections: Vec<ScoringSection>,
    #[serde(default)]
    pub total_points: f64,
    /// Percent of total points considered competitive
    #[serde(default)]
    pub competitive_threshold: f64,
    #[serde(default)]
    pub page_limit: f64,
    #[serde(default)]
    pub format_requirements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic_model: Option<LogicModel>,
}

impl ScoringMap {
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetItem {
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub allowable: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FixSeverity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedTeamFix {
    pub area: String,
    pub severity: FixSeverity,
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One turn of the free-form Q&A exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub at: DateTime<Utc>,
}

fn default_org_profile() -> String {
    DEFAULT_ORG_PROFILE.to_string()
}

fn default_is_sbir() -> bool {
    true
}

/// Root record holding all user input and every agent-produced artifact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProposalState {
    #[serde(default)]
    pub nofo_text: String,
    #[serde(default = "default_org_profile")]
    pub org_profile: String,
    #[serde(rename = "isSBIR", default = "default_is_sbir")]
    pub is_sbir: bool,
    #[serde(default)]
    pub scoring_map: Option<ScoringMap>,
    #[serde(default)]
    pub compliance_checks: Vec<ComplianceCheck>,
    #[serde(default)]
    pub compliance_rationale: Option<String>,
    #[serde(default)]
    pub go_no_go: Option<Decision>,
    #[serde(default)]
    pub narrative: BTreeMap<String, String>,
    #[serde(default)]
    pub budget: Vec<BudgetItem>,
    #[serde(default)]
    pub red_team_score: Option<f64>,
    #[serde(default)]
    pub red_team_fixes: Vec<RedTeamFix>,
    #[serde(default)]
    pub readiness_verdict: Option<String>,
    #[serde(default)]
    pub chat: Vec<ChatMessage>,
}

impl Default for ProposalState {
    fn default() -> Self {
        Self {
            nofo_text: String::new(),
            org_profile: default_org_profile(),
            is_sbir: default_is_sbir(),
            scoring_map: None,
            compliance_checks: Vec::new(),
            compliance_rationale: None,
            go_no_go: None,
            narrative: BTreeMap::new(),
            budget: Vec::new(),
            red_team_score: None,
            red_team_fixes: Vec::new(),
            readiness_verdict: None,
            chat: Vec::new(),
        }
    }
}

impl ProposalState {
    /// Sum of all budget line items
    pub fn budget_total(&self) -> f64 {
        self.budget.iter().map(|item| item.amount).sum()
    }

    /// Scoring-map sections that have no drafted narrative yet
    pub fn undrafted_sections(&self) -> Vec<String> {
        match &self.scoring_map {
            Some(map) => map
                .section_names()
                .filter(|name| !self.narrative.contains_key(*name))
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Apply a shallow root-level merge
    ///
    /// Each populated patch field replaces the whole root field. Nested
    /// collections are never edited in place.
    pub fn merge(&mut self, patch: ProposalPatch) {
        if let Some(v) = patch.nofo_text {
            self.nofo_text = v;
        }
        if let Some(v) = patch.org_profile {
            self.org_profile = v;
        }
        if let Some(v) = patch.is_sbir {
            self.is_sbir = v;
        }
        if let Some(v) = patch.scoring_map {
            self.scoring_map = Some(v);
        }
        if let Some(v) = patch.compliance_checks {
            self.compliance_checks = v;
        }
        if let Some(v) = patch.compliance_rationale {
            self.compliance_rationale = Some(v);
        }
        if let Some(v) = patch.go_no_go {
            self.go_no_go = Some(v);
        }
        if let Some(v) = patch.narrative {
            self.narrative = v;
        }
        if let Some(v) = patch.budget {
            self.budget = v;
        }
        if let Some(v) = patch.red_team_score {
            self.red_team_score = Some(v);
        }
        if let Some(v) = patch.red_team_fixes {
            self.red_team_fixes = v;
        }
        if let Some(v) = patch.readiness_verdict {
            self.readiness_verdict = Some(v);
        }
        if let Some(v) = patch.chat {
            self.chat = v;
        }
    }

    /// Build a patch that replaces the narrative map with a copy holding `text` under `section`
    pub fn narrative_entry(&self, section: &str, text: String) -> ProposalPatch {
        let mut narrative = self.narrative.clone();
        narrative.insert(section.to_string(), text);
        ProposalPatch {
            narrative: Some(narrative),
            ..Default::default()
        }
    }
}

/// Partial update of [`ProposalState`]; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct ProposalPatch {
    pub nofo_text: Option<String>,
    pub org_profile: Option<String>,
    pub is_sbir: Option<bool>,
    pub scoring_map: Option<ScoringMap>,
    pub compliance_checks: Option<Vec<ComplianceCheck>>,
    pub compliance_rationale: Option<String>,
    pub go_no_go: Option<Decision>,
    pub narrative: Option<BTreeMap<String, String>>,
    pub budget: Option<Vec<BudgetItem>>,
    pub red_team_score: Option<f64>,
    pub red_team_fixes: Option<Vec<RedTeamFix>>,
    pub readiness_verdict: Option<String>,
    pub chat: Option<Vec<ChatMessage>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(category: &str, amount: f64) -> BudgetItem {
        BudgetItem {
            category: category.to_string(),
            description: String::new(),
            amount,
            justification: String::new(),
            allowable: true,
        }
    }

    #[test]
    fn test_default_record() {
        let state = ProposalState::default();
        assert!(state.nofo_text.is_empty());
        assert_eq!(state.org_profile, DEFAULT_ORG_PROFILE);
        assert!(state.is_sbir);
        assert!(state.scoring_map.is_none());
        assert!(state.go_no_go.is_none());
        assert!(state.narrative.is_empty());
        assert!(state.budget.is_empty());
        assert!(state.red_team_score.is_none());
    }

    #[test]
    fn test_json_field_names_match_storage_layout() {
        let value = serde_json::to_value(ProposalState::default()).unwrap();
        assert!(value.get("nofoText").is_some());
        assert!(value.get("isSBIR").is_some());
        assert!(value.get("goNoGo").is_some());
        assert!(value.get("redTeamFixes").is_some());
    }

    #[test]
    fn test_legacy_record_without_new_fields_loads() {
        let raw = r#"{
            "nofoText": "Agency X RFP",
            "orgProfile": "Acme",
            "isSBIR": false,
            "scoringMap": null,
            "complianceChecks": [],
            "goNoGo": "NO-GO",
            "narrative": {},
            "budget": [],
            "redTeamScore": null,
            "redTeamFixes": []
        }"#;
        let state: ProposalState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.go_no_go, Some(Decision::NoGo));
        assert!(!state.is_sbir);
        assert!(state.chat.is_empty());
    }

    #[test]
    fn test_missing_fields_take_record_defaults() {
        let state: ProposalState = serde_json::from_str(r#"{"nofoText": "RFP"}"#).unwrap();
        assert!(state.is_sbir);
        assert_eq!(state.org_profile, DEFAULT_ORG_PROFILE);

        let empty: ProposalState = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, ProposalState::default());
    }

    #[test]
    fn test_budget_total_is_derived() {
        let mut state = ProposalState::default();
        state.budget = vec![item("Personnel", 120_000.0), item("Travel", 4_500.5)];
        assert_eq!(state.budget_total(), 124_500.5);
    }

    #[test]
    fn test_merge_replaces_only_given_fields() {
        let mut state = ProposalState::default();
        state.nofo_text = "keep me".to_string();
        state.merge(ProposalPatch {
            go_no_go: Some(Decision::Go),
            budget: Some(vec![item("Equipment", 10.0)]),
            ..Default::default()
        });
        assert_eq!(state.nofo_text, "keep me");
        assert_eq!(state.go_no_go, Some(Decision::Go));
        assert_eq!(state.budget.len(), 1);
    }

    #[test]
    fn test_narrative_entry_is_copy_on_write() {
        let mut state = ProposalState::default();
        state.narrative.insert("Need".to_string(), "old".to_string());

        let patch = state.narrative_entry("Technical Approach", "draft".to_string());
        // Source record untouched until merged
        assert_eq!(state.narrative.len(), 1);

        state.merge(patch);
        assert_eq!(state.narrative.len(), 2);
        assert_eq!(state.narrative["Need"], "old");
        assert_eq!(state.narrative["Technical Approach"], "draft");
    }

    #[test]
    fn test_undrafted_sections() {
        let mut state = ProposalState::default();
        assert!(state.undrafted_sections().is_empty());

        state.scoring_map = Some(ScoringMap {
            sections: vec![
                ScoringSection { name: "Need".into(), points: 20.0, subsections: 1.0 },
                ScoringSection { name: "Approach".into(), points: 40.0, subsections: 3.0 },
            ],
            ..Default::default()
        });
        state.narrative.insert("Need".into(), "text".into());
        assert_eq!(state.undrafted_sections(), vec!["Approach".to_string()]);
    }
}
