// Grant Factory - staged grant proposal pipeline
// Drives a solicitation from compliance check to submission package with AI agents

pub mod bid;
pub mod cli;
pub mod error;
pub mod gateway;
pub mod models;
pub mod state;
pub mod workflow;

pub use anyhow::{Context, Result};
pub use colored::Colorize;

// Re-export commonly used types
pub use error::{GatewayError, WorkflowError};
pub use models::{ProposalState, StageStatus, STAGES};
pub use state::{Store, WorkflowSession};
pub use workflow::{ExportPackage, Factory, StageTracker};
