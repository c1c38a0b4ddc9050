pub mod bid;
pub mod config;
pub mod proposal;
pub mod stage;

pub use bid::{
    BidStage, BidState, Journey, JourneyStatus, Notification, NotificationKind, Opportunity,
    OpportunitySource, Priority, Task, TaskStatus, UserProfile,
};
pub use config::{FactoryConfig, GeminiConfig};
pub use proposal::{
    BudgetItem, ChatMessage, ChatRole, CheckStatus, ComplianceCheck, Decision, FixSeverity,
    LogicModel, ProposalPatch, ProposalState, RedTeamFix, ScoringMap, ScoringSection,
};
pub use stage::{Stage, StageStatus, STAGES};
