use serde::{Deserialize, Serialize};

/// A single step of the proposal pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub id: u32,
    pub name: &'static str,
    /// Agent responsible for the stage
    pub agent: &'static str,
    pub description: &'static str,
    /// May be skipped depending on the SBIR flag
    pub conditional: bool,
}

/// Stage ids, dense and ordered
pub const COMPLIANCE: u32 = 1;
pub const ARCHITECTURE: u32 = 2;
pub const NARRATIVE: u32 = 3;
pub const COMMERCIALIZATION: u32 = 4;
pub const BUDGET: u32 = 5;
pub const RED_TEAM: u32 = 6;
pub const SUBMISSION: u32 = 7;

/// Stage whose completion may skip the next stage
pub const CONDITIONAL_GATE: u32 = NARRATIVE;

pub const STAGES: &[Stage] = &[
    Stage {
        id: COMPLIANCE,
        name: "Compliance & Go/No-Go",
        agent: "Compliance Agent",
        description: "Eligibility verification & fatal flaw detection",
        conditional: false,
    },
    Stage {
        id: ARCHITECTURE,
        name: "Grant Architecture",
        agent: "Architecture Agent",
        description: "Logic models & scoring architecture mapping",
        conditional: false,
    },
    Stage {
        id: NARRATIVE,
        name: "Narrative Drafting",
        agent: "Narrative Drafting Agent",
        description: "Modular section-by-section generation",
        conditional: false,
    },
    Stage {
        id: COMMERCIALIZATION,
        name: "SBIR Commercialization",
        agent: "SBIR Agent",
        description: "TAM/SAM/SOM & revenue pathways",
        conditional: true,
    },
    Stage {
        id: BUDGET,
        name: "Budget & Allowability",
        agent: "Budget Agent",
        description: "2 CFR 200 compliance & category allocation",
        conditional: false,
    },
    Stage {
        id: RED_TEAM,
        name: "Red Team Review",
        agent: "Red Team Agent",
        description: "Scoring simulation & fix list generation",
        conditional: false,
    },
    Stage {
        id: SUBMISSION,
        name: "Submission & Archive",
        agent: "Master Orchestrator",
        description: "Final package export & win-rate metrics",
        conditional: false,
    },
];

/// Look up a stage by id
pub fn stage(id: u32) -> Option<&'static Stage> {
    STAGES.iter().find(|s| s.id == id)
}

/// Id of the last stage in the pipeline
pub fn last_stage_id() -> u32 {
    STAGES.last().map(|s| s.id).unwrap_or(0)
}

/// Status of a stage in the workflow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Locked,
    Active,
    Complete,
    Skipped,
    Failed,
}

impl StageStatus {
    pub fn name(&self) -> &'static str {
        match self {
            StageStatus::Locked => "locked",
            StageStatus::Active => "active",
            StageStatus::Complete => "complete",
            StageStatus::Skipped => "skipped",
            StageStatus::Failed => "failed",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            StageStatus::Locked => "🔒",
            StageStatus::Active => "⚡",
            StageStatus::Complete => "✅",
            StageStatus::Skipped => "⏭️",
            StageStatus::Failed => "❌",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_ids_are_dense() {
        for (idx, stage) in STAGES.iter().enumerate() {
            assert_eq!(stage.id, idx as u32 + 1);
        }
        assert_eq!(last_stage_id(), SUBMISSION);
    }

    #[test]
    fn test_only_commercialization_is_conditional() {
        let conditional: Vec<u32> = STAGES.iter().filter(|s| s.conditional).map(|s| s.id).collect();
        assert_eq!(conditional, vec![COMMERCIALIZATION]);
        assert_eq!(CONDITIONAL_GATE + 1, COMMERCIALIZATION);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&StageStatus::Skipped).unwrap();
        assert_eq!(json, "\"skipped\"");
        let back: StageStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(back, StageStatus::Failed);
    }

    #[test]
    fn test_lookup_unknown_stage() {
        assert!(stage(0).is_none());
        assert!(stage(8).is_none());
        assert_eq!(stage(4).unwrap().name, "SBIR Commercialization");
    }
}
