//! Bid-tracking records: opportunities, journeys, tasks and notifications

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BidStage {
    #[serde(rename = "SOURCES_SOUGHT")]
    SourcesSought,
    #[serde(rename = "PRE_SOLICITATION")]
    PreSolicitation,
    #[serde(rename = "SOLICITATION")]
    Solicitation,
    #[serde(rename = "AWARD")]
    Award,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
pub enum OpportunitySource {
    #[serde(rename = "sam.gov")]
    #[value(name = "sam.gov")]
    SamGov,
    #[serde(rename = "grants.gov")]
    #[value(name = "grants.gov")]
    GrantsGov,
    #[serde(rename = "state")]
    State,
    #[serde(rename = "city")]
    City,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum JourneyStatus {
    InProgress,
    AutopilotComplete,
    Review,
    Submitted,
    Archived,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    ToDo,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Opportunity,
    System,
    Award,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SamGovStatus {
    Unregistered,
    Pending,
    Active,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Subscription {
    Free,
    Pro,
    Enterprise,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub company_name: String,
    pub credits: u32,
    pub is_trial: bool,
    pub sam_gov_status: SamGovStatus,
    pub subscription: Subscription,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uei: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cage_code: Option<String>,
    #[serde(default)]
    pub readiness_score: u32,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub naics: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            company_name: String::new(),
            credits: 0,
            is_trial: true,
            sam_gov_status: SamGovStatus::Unregistered,
            subscription: Subscription::Free,
            uei: None,
            cage_code: None,
            readiness_score: 0,
            capabilities: Vec::new(),
            naics: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    pub source: OpportunitySource,
    pub notice_id: String,
    pub title: String,
    pub agency: String,
    pub due_date: String,
    #[serde(default)]
    pub description: String,
    pub bid_stage: BidStage,
    #[serde(default)]
    pub estimated_award: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naics: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    pub id: String,
    pub opportunity_id: String,
    pub status: JourneyStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub journey_id: String,
    pub title: String,
    pub priority: Priority,
    pub deadline: String,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: String,
    pub read: bool,
}

/// Root record of the bid-tracking application
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BidState {
    #[serde(default)]
    pub user: UserProfile,
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_opportunity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_journey_id: Option<String>,
    #[serde(default)]
    pub journeys: Vec<Journey>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub auto_search_terms: Vec<String>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&TaskStatus::ToDo).unwrap(), "\"to-do\"");
        assert_eq!(
            serde_json::to_string(&JourneyStatus::AutopilotComplete).unwrap(),
            "\"autopilot_complete\""
        );
        assert_eq!(serde_json::to_string(&OpportunitySource::SamGov).unwrap(), "\"sam.gov\"");
        assert_eq!(serde_json::to_string(&BidStage::PreSolicitation).unwrap(), "\"PRE_SOLICITATION\"");
    }

    fn wire_name<T: Serialize>(value: &T) -> String {
        serde_json::to_value(value).unwrap().as_str().unwrap().to_string()
    }

    fn assert_cli_matches_wire<T: ValueEnum + Serialize>() {
        for variant in T::value_variants() {
            let cli = variant.to_possible_value().unwrap();
            assert_eq!(cli.get_name(), wire_name(variant));
        }
    }

    #[test]
    fn test_cli_names_match_wire_names() {
        assert_cli_matches_wire::<BidStage>();
        assert_cli_matches_wire::<OpportunitySource>();
        assert_cli_matches_wire::<JourneyStatus>();
        assert_cli_matches_wire::<TaskStatus>();
        assert_cli_matches_wire::<Priority>();
        assert_cli_matches_wire::<NotificationKind>();
    }

    #[test]
    fn test_notification_kind_field_is_type() {
        let n = Notification {
            id: "n1".into(),
            kind: NotificationKind::Award,
            title: "Won".into(),
            message: "Contract awarded".into(),
            timestamp: "2026-01-01T00:00:00Z".into(),
            read: false,
        };
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "award");
    }

    #[test]
    fn test_empty_object_decodes_to_default() {
        let state: BidState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, BidState::default());
    }
}
