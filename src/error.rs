//! Typed errors for the gateway and workflow boundaries

use thiserror::Error;

/// Failure of a single exchange with the model API
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("model API returned no content")]
    EmptyResponse,

    #[error("response is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("response does not match schema: {0}")]
    SchemaMismatch(String),
}

/// Rejection of a workflow intent
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("another agent operation is already in progress")]
    Busy,

    #[error("unknown stage {0}")]
    UnknownStage(u32),

    #[error("stage {0} is locked")]
    StageLocked(u32),

    #[error("missing input: {0}")]
    MissingInput(&'static str),

    #[error("narrative sections not drafted: {}", .0.join(", "))]
    NarrativeIncomplete(Vec<String>),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = WorkflowError::NarrativeIncomplete(vec!["Need".into(), "Approach".into()]);
        assert_eq!(err.to_string(), "narrative sections not drafted: Need, Approach");

        let err: WorkflowError = GatewayError::MissingInput("solicitation").into();
        assert_eq!(err.to_string(), "missing input: solicitation");

        let err = WorkflowError::NotFound { kind: "task", id: "t-1".into() };
        assert_eq!(err.to_string(), "task 't-1' not found");
    }
}
