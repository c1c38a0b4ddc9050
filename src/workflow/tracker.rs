//! Stage status tracking and the unlock transition table

use crate::error::WorkflowError;
use crate::models::stage::{self, StageStatus, CONDITIONAL_GATE, STAGES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of completing a stage: which stage opens next and which one is skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Successor {
    pub next: u32,
    pub skipped: Option<u32>,
}

/// Transition table keyed by `(completed stage, SBIR flag)`
///
/// Returns `None` for the last stage and for unknown ids.
pub fn successor(stage_id: u32, is_sbir: bool) -> Option<Successor> {
    if stage::stage(stage_id).is_none() || stage_id >= stage::last_stage_id() {
        return None;
    }

    match (stage_id, is_sbir) {
        (CONDITIONAL_GATE, false) => Some(Successor {
            next: CONDITIONAL_GATE + 2,
            skipped: Some(CONDITIONAL_GATE + 1),
        }),
        (id, _) => Some(Successor {
            next: id + 1,
            skipped: None,
        }),
    }
}

/// Stage id → status map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTracker {
    statuses: BTreeMap<u32, StageStatus>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    /// Stage 1 active, everything else locked
    pub fn new() -> Self {
        let statuses = STAGES
            .iter()
            .map(|s| {
                let status = if s.id == stage::COMPLIANCE {
                    StageStatus::Active
                } else {
                    StageStatus::Locked
                };
                (s.id, status)
            })
            .collect();
        Self { statuses }
    }

    pub fn status(&self, stage_id: u32) -> StageStatus {
        self.statuses
            .get(&stage_id)
            .copied()
            .unwrap_or(StageStatus::Locked)
    }

    pub fn statuses(&self) -> &BTreeMap<u32, StageStatus> {
        &self.statuses
    }

    /// Set a stage's status, unlocking (or skipping past) the following stage on completion
    pub fn transition(
        &mut self,
        stage_id: u32,
        status: StageStatus,
        is_sbir: bool,
    ) -> Result<Option<Successor>, WorkflowError> {
        if stage::stage(stage_id).is_none() {
            return Err(WorkflowError::UnknownStage(stage_id));
        }

        if status != StageStatus::Complete {
            // Completion is final
            if self.status(stage_id) != StageStatus::Complete {
                self.statuses.insert(stage_id, status);
            }
            return Ok(None);
        }
        self.statuses.insert(stage_id, status);

        let Some(next) = successor(stage_id, is_sbir) else {
            return Ok(None);
        };

        if let Some(skipped) = next.skipped {
            if self.status(skipped) != StageStatus::Complete {
                self.statuses.insert(skipped, StageStatus::Skipped);
            }
        }
        if self.status(next.next) != StageStatus::Complete {
            self.statuses.insert(next.next, StageStatus::Active);
        }

        Ok(Some(next))
    }

    /// Whether the user may open a stage
    pub fn can_navigate(&self, stage_id: u32) -> bool {
        stage::stage(stage_id).is_some() && self.status(stage_id) != StageStatus::Locked
    }

    pub fn completed_count(&self) -> usize {
        self.statuses
            .values()
            .filter(|s| **s == StageStatus::Complete)
            .count()
    }

    /// Completed stages as a rounded percentage of all stages
    pub fn progress_percent(&self) -> u32 {
        ((self.completed_count() as f64 / STAGES.len() as f64) * 100.0).round() as u32
    }

    /// Last stage reached `complete`
    pub fn is_finished(&self) -> bool {
        self.status(stage::last_stage_id()) == StageStatus::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stage::*;

    fn complete(tracker: &mut StageTracker, id: u32, is_sbir: bool) {
        tracker
            .transition(id, StageStatus::Complete, is_sbir)
            .unwrap();
    }

    #[test]
    fn test_initial_statuses() {
        let tracker = StageTracker::new();
        assert_eq!(tracker.status(COMPLIANCE), StageStatus::Active);
        for id in 2..=7 {
            assert_eq!(tracker.status(id), StageStatus::Locked);
        }
        assert_eq!(tracker.progress_percent(), 0);
    }

    #[test]
    fn test_successor_table() {
        assert_eq!(successor(1, false), Some(Successor { next: 2, skipped: None }));
        assert_eq!(successor(3, true), Some(Successor { next: 4, skipped: None }));
        assert_eq!(successor(3, false), Some(Successor { next: 5, skipped: Some(4) }));
        assert_eq!(successor(4, false), Some(Successor { next: 5, skipped: None }));
        assert_eq!(successor(7, true), None);
        assert_eq!(successor(0, true), None);
        assert_eq!(successor(9, true), None);
    }

    #[test]
    fn test_complete_unlocks_next() {
        let mut tracker = StageTracker::new();
        complete(&mut tracker, COMPLIANCE, true);
        assert_eq!(tracker.status(COMPLIANCE), StageStatus::Complete);
        assert_eq!(tracker.status(ARCHITECTURE), StageStatus::Active);
        assert_eq!(tracker.status(NARRATIVE), StageStatus::Locked);
    }

    #[test]
    fn test_conditional_skip_without_sbir() {
        let mut tracker = StageTracker::new();
        for id in [COMPLIANCE, ARCHITECTURE, NARRATIVE] {
            complete(&mut tracker, id, false);
        }
        assert_eq!(tracker.status(COMMERCIALIZATION), StageStatus::Skipped);
        assert_eq!(tracker.status(BUDGET), StageStatus::Active);
    }

    #[test]
    fn test_conditional_path_with_sbir() {
        let mut tracker = StageTracker::new();
        for id in [COMPLIANCE, ARCHITECTURE, NARRATIVE] {
            complete(&mut tracker, id, true);
        }
        assert_eq!(tracker.status(COMMERCIALIZATION), StageStatus::Active);
        assert_eq!(tracker.status(BUDGET), StageStatus::Locked);
        assert!(tracker
            .statuses()
            .values()
            .all(|s| *s != StageStatus::Skipped));
    }

    #[test]
    fn test_never_regresses_complete_stage() {
        let mut tracker = StageTracker::new();
        complete(&mut tracker, COMPLIANCE, true);
        complete(&mut tracker, ARCHITECTURE, true);

        // Re-completing stage 1 must not re-activate the completed stage 2
        complete(&mut tracker, COMPLIANCE, true);
        assert_eq!(tracker.status(ARCHITECTURE), StageStatus::Complete);
        assert_eq!(tracker.status(NARRATIVE), StageStatus::Active);
    }

    #[test]
    fn test_complete_stage_cannot_be_reset_to_active() {
        let mut tracker = StageTracker::new();
        complete(&mut tracker, COMPLIANCE, true);

        tracker.transition(COMPLIANCE, StageStatus::Active, true).unwrap();
        tracker.transition(COMPLIANCE, StageStatus::Failed, true).unwrap();
        assert_eq!(tracker.status(COMPLIANCE), StageStatus::Complete);
    }

    #[test]
    fn test_unlock_monotonicity_along_pipeline() {
        for is_sbir in [true, false] {
            let mut tracker = StageTracker::new();
            let mut current = COMPLIANCE;
            loop {
                complete(&mut tracker, current, is_sbir);
                for earlier in 1..=current {
                    assert_ne!(tracker.status(earlier), StageStatus::Locked);
                }
                match successor(current, is_sbir) {
                    Some(next) => current = next.next,
                    None => break,
                }
            }
            assert!(tracker.is_finished());
        }
    }

    #[test]
    fn test_last_stage_is_terminal() {
        let mut tracker = StageTracker::new();
        let next = tracker
            .transition(SUBMISSION, StageStatus::Complete, true)
            .unwrap();
        assert!(next.is_none());
        assert!(tracker.is_finished());
    }

    #[test]
    fn test_unknown_stage_rejected() {
        let mut tracker = StageTracker::new();
        let err = tracker.transition(42, StageStatus::Complete, true).unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownStage(42)));
        assert_eq!(tracker, StageTracker::new());
    }

    #[test]
    fn test_navigation_blocked_when_locked() {
        let mut tracker = StageTracker::new();
        assert!(tracker.can_navigate(COMPLIANCE));
        assert!(!tracker.can_navigate(ARCHITECTURE));
        assert!(!tracker.can_navigate(99));

        complete(&mut tracker, COMPLIANCE, true);
        assert!(tracker.can_navigate(ARCHITECTURE));
    }

    #[test]
    fn test_progress_percent() {
        let mut tracker = StageTracker::new();
        complete(&mut tracker, COMPLIANCE, true);
        complete(&mut tracker, ARCHITECTURE, true);
        // 2 / 7 = 28.57
        assert_eq!(tracker.progress_percent(), 29);
    }
}
