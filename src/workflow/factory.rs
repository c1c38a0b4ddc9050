//! Factory - runs stage agents against the session, one at a time
//!
//! Every agent operation follows the same contract:
//! - rejected with [`WorkflowError::Busy`] while another operation is in flight,
//!   in this factory or in any other process sharing the state directory
//! - the session is reloaded from disk once the lock is held
//! - missing input is logged and rejected before any model call
//! - on success the typed result is merged, logged, and the stage advanced
//! - on failure only an error line is logged; proposal state and stage
//!   statuses are left exactly as they were

use super::export::{self, ExportPackage};
use crate::error::{GatewayError, WorkflowError};
use crate::gateway::{ComplianceResult, Gateway, RedTeamResult};
use crate::models::stage::{self, StageStatus};
use crate::models::{
    BudgetItem, ChatMessage, ChatRole, ProposalPatch, ProposalState, ScoringMap,
};
use crate::state::{StateLock, WorkflowSession};
use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

const NO_SOLICITATION: &str = "Error: No solicitation input provided.";
const NO_SCORING_MAP: &str = "Error: No scoring map available. Generate architecture first.";

/// "An agent is working" flag: an in-process atomic in front of the
/// cross-process [`StateLock`]
#[derive(Debug, Default)]
pub struct ProcessingLock {
    busy: AtomicBool,
}

/// Releases the state lock, then the processing flag, when dropped
#[derive(Debug)]
pub struct ProcessingGuard<'a> {
    busy: &'a AtomicBool,
    state: Option<StateLock>,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.state.take();
        self.busy.store(false, Ordering::Release);
    }
}

impl ProcessingLock {
    pub fn try_acquire(&self, state_dir: &Path) -> Result<ProcessingGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| WorkflowError::Busy)?;
        let mut guard = ProcessingGuard {
            busy: &self.busy,
            state: None,
        };
        guard.state = Some(StateLock::acquire(state_dir)?);
        Ok(guard)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

pub struct Factory {
    session: Mutex<WorkflowSession>,
    gateway: Gateway,
    processing: ProcessingLock,
}

impl Factory {
    pub fn new(session: WorkflowSession, gateway: Gateway) -> Self {
        Self {
            session: Mutex::new(session),
            gateway,
            processing: ProcessingLock::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WorkflowSession> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run a synchronous closure against the session
    pub fn with_session<R>(&self, f: impl FnOnce(&mut WorkflowSession) -> R) -> R {
        let mut session = self.lock();
        f(&mut session)
    }

    /// Snapshot of the proposal record
    pub fn proposal(&self) -> ProposalState {
        self.lock().proposal().clone()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.is_busy()
    }

    /// Claim the processing flag and the state lock for the lifetime of the
    /// guard, then reload the session so it reflects other writers
    pub fn begin_processing(&self) -> Result<ProcessingGuard<'_>> {
        let state_dir = self.lock().store().dir().to_path_buf();
        let guard = self.processing.try_acquire(&state_dir)?;
        self.lock().reload();
        Ok(guard)
    }

    fn log(&self, message: impl AsRef<str>) -> Result<()> {
        self.lock().add_log(message)
    }

    /// Reject operations on stages the user cannot open
    fn ensure_reachable(&self, stage_id: u32) -> Result<()> {
        let session = self.lock();
        match session.stages().status(stage_id) {
            StageStatus::Locked | StageStatus::Skipped => {
                Err(WorkflowError::StageLocked(stage_id).into())
            }
            _ => Ok(()),
        }
    }

    fn reject<T>(&self, line: &str, err: WorkflowError) -> Result<T> {
        self.log(line)?;
        Err(err.into())
    }

    fn fail<T>(&self, line: &str, err: GatewayError) -> Result<T> {
        warn!(error = %err, "agent call failed");
        self.log(line)?;
        Err(WorkflowError::Gateway(err).into())
    }

    // =========================================================================
    // Stage agents
    // =========================================================================

    /// Stage 1: compliance check. Only a GO decision completes the stage.
    pub async fn run_compliance(&self) -> Result<ComplianceResult> {
        let _guard = self.begin_processing()?;

        let (nofo, profile, pdf) = self.with_session(|s| {
            (
                s.proposal().nofo_text.clone(),
                s.proposal().org_profile.clone(),
                s.uploaded_file().map(|f| f.base64.clone()),
            )
        });
        if nofo.trim().is_empty() && pdf.is_none() {
            return self.reject(
                NO_SOLICITATION,
                WorkflowError::MissingInput("solicitation text or PDF"),
            );
        }

        self.log("Activating Compliance Agent...")?;
        let result = match self
            .gateway
            .evaluate_compliance(&nofo, &profile, pdf.as_deref())
            .await
        {
            Ok(result) => result,
            Err(e) => return self.fail("Error: Compliance check failed.", e),
        };

        self.with_session(|s| -> Result<()> {
            s.merge(ProposalPatch {
                go_no_go: Some(result.decision),
                compliance_checks: Some(result.checks.clone()),
                compliance_rationale: Some(result.rationale.clone()),
                ..Default::default()
            })?;
            s.add_log(format!(
                "Compliance check complete. Decision: {}",
                result.decision
            ))?;
            if result.decision.is_go() {
                s.complete_stage(stage::COMPLIANCE)?;
            }
            Ok(())
        })?;

        Ok(result)
    }

    /// Stage 2: scoring map and logic model
    pub async fn generate_architecture(&self) -> Result<ScoringMap> {
        let _guard = self.begin_processing()?;
        self.ensure_reachable(stage::ARCHITECTURE)?;

        let (nofo, pdf) = self.with_session(|s| {
            (
                s.proposal().nofo_text.clone(),
                s.uploaded_file().map(|f| f.base64.clone()),
            )
        });
        if nofo.trim().is_empty() && pdf.is_none() {
            return self.reject(
                NO_SOLICITATION,
                WorkflowError::MissingInput("solicitation text or PDF"),
            );
        }

        self.log("Grant Architecture Agent mapping evaluation criteria...")?;
        let map = match self.gateway.generate_architecture(&nofo, pdf.as_deref()).await {
            Ok(map) => map,
            Err(e) => return self.fail("Error: Architecture generation failed.", e),
        };

        self.with_session(|s| -> Result<()> {
            s.merge(ProposalPatch {
                scoring_map: Some(map.clone()),
                ..Default::default()
            })?;
            s.add_log("Architecture generation complete. Scoring map defined.")?;
            s.complete_stage(stage::ARCHITECTURE)?;
            Ok(())
        })?;

        Ok(map)
    }

    /// Stage 3: draft (or re-draft) one narrative section
    pub async fn draft_section(&self, section: &str) -> Result<String> {
        let _guard = self.begin_processing()?;
        self.ensure_reachable(stage::NARRATIVE)?;

        if section.trim().is_empty() {
            return self.reject(
                "Error: No section selected.",
                WorkflowError::MissingInput("section name"),
            );
        }

        let (profile, map) = self.with_session(|s| {
            (
                s.proposal().org_profile.clone(),
                s.proposal().scoring_map.clone(),
            )
        });

        self.log(format!("Narrative Drafting Agent generating: {}...", section))?;
        let text = match self
            .gateway
            .draft_section(section, &profile, map.as_ref())
            .await
        {
            Ok(text) => text,
            Err(e) => return self.fail(&format!("Error drafting {}.", section), e),
        };

        self.with_session(|s| -> Result<()> {
            s.put_narrative(section, text.clone())?;
            s.add_log(format!("Section {} drafted.", section))
        })?;

        Ok(text)
    }

    /// Stage 3: approve the narrative once every scoring-map section has a draft
    pub fn approve_narrative(&self) -> Result<Option<u32>> {
        let _guard = self.begin_processing()?;
        self.ensure_reachable(stage::NARRATIVE)?;

        self.with_session(|s| -> Result<Option<u32>> {
            let missing = s.proposal().undrafted_sections();
            if !missing.is_empty() {
                return Err(WorkflowError::NarrativeIncomplete(missing).into());
            }
            if s.proposal().narrative.is_empty() {
                return Err(WorkflowError::MissingInput("narrative section").into());
            }
            s.add_log("Narrative approved.")?;
            s.complete_stage(stage::NARRATIVE)
        })
    }

    /// Stage 4: close out the SBIR commercialization pathway
    pub fn complete_commercialization(&self) -> Result<Option<u32>> {
        let _guard = self.begin_processing()?;
        self.ensure_reachable(stage::COMMERCIALIZATION)?;

        self.with_session(|s| -> Result<Option<u32>> {
            s.add_log("SBIR commercialization modules processed.")?;
            s.complete_stage(stage::COMMERCIALIZATION)
        })
    }

    /// Stage 5: budget from the scoring map's logic model
    pub async fn generate_budget(&self) -> Result<Vec<BudgetItem>> {
        let _guard = self.begin_processing()?;
        self.ensure_reachable(stage::BUDGET)?;

        let (nofo, map) = self.with_session(|s| {
            (
                s.proposal().nofo_text.clone(),
                s.proposal().scoring_map.clone(),
            )
        });
        let Some(map) = map else {
            return self.reject(NO_SCORING_MAP, WorkflowError::MissingInput("scoring map"));
        };
        let logic_model = map.logic_model.clone().unwrap_or_default();

        self.log("Budget Agent calculating allowability...")?;
        let items = match self.gateway.generate_budget(&nofo, Some(&logic_model)).await {
            Ok(items) => items,
            Err(e) => return self.fail("Error: Budget generation failed.", e),
        };

        self.with_session(|s| -> Result<()> {
            s.merge(ProposalPatch {
                budget: Some(items.clone()),
                ..Default::default()
            })?;
            s.add_log(
                "Budget generation complete. All line items verified for 2 CFR 200 compliance.",
            )?;
            s.complete_stage(stage::BUDGET)?;
            Ok(())
        })?;

        Ok(items)
    }

    /// Stage 6: simulated peer review
    pub async fn run_red_team(&self) -> Result<RedTeamResult> {
        let _guard = self.begin_processing()?;
        self.ensure_reachable(stage::RED_TEAM)?;

        let proposal = self.proposal();
        if proposal.scoring_map.is_none() {
            return self.reject(NO_SCORING_MAP, WorkflowError::MissingInput("scoring map"));
        }

        self.log("Red Team Agent simulating peer review...")?;
        let review = match self.gateway.run_red_team(&proposal).await {
            Ok(review) => review,
            Err(e) => return self.fail("Error: Red Team review failed.", e),
        };

        self.with_session(|s| -> Result<()> {
            s.merge(ProposalPatch {
                red_team_score: Some(review.estimated_score),
                red_team_fixes: Some(review.fixes.clone()),
                readiness_verdict: review.readiness_verdict.clone(),
                ..Default::default()
            })?;
            s.add_log(format!(
                "Red Team Review finished. Estimated Score: {}",
                review.estimated_score
            ))?;
            s.complete_stage(stage::RED_TEAM)?;
            Ok(())
        })?;

        Ok(review)
    }

    /// Stage 7: complete the workflow and build the submission package
    pub fn finalize(&self) -> Result<ExportPackage> {
        let _guard = self.begin_processing()?;
        self.ensure_reachable(stage::SUBMISSION)?;

        self.with_session(|s| -> Result<ExportPackage> {
            let package = export::build_package(s.proposal());
            s.complete_stage(stage::SUBMISSION)?;
            s.add_log("Proposal package finalized.")?;
            info!(sections = package.sections, "proposal finalized");
            Ok(package)
        })
    }

    /// Free-form question, appended to the chat history; no stage effect
    pub async fn ask(&self, question: &str) -> Result<String> {
        let _guard = self.begin_processing()?;

        if question.trim().is_empty() {
            return self.reject("Error: Empty question.", WorkflowError::MissingInput("question"));
        }

        let proposal = self.proposal();
        let asked_at = Utc::now();
        let answer = match self.gateway.ask(question, &proposal).await {
            Ok(answer) => answer,
            Err(e) => return self.fail("Error: Question could not be answered.", e),
        };

        self.with_session(|s| -> Result<()> {
            let mut chat = s.proposal().chat.clone();
            chat.push(ChatMessage {
                role: ChatRole::User,
                text: question.to_string(),
                at: asked_at,
            });
            chat.push(ChatMessage {
                role: ChatRole::Model,
                text: answer.clone(),
                at: Utc::now(),
            });
            s.merge(ProposalPatch {
                chat: Some(chat),
                ..Default::default()
            })?;
            s.add_log("Orchestrator answered a question.")
        })?;

        Ok(answer)
    }

    // =========================================================================
    // Pass-through intents
    // =========================================================================

    /// Open a stage. While this factory's own agent is working the session
    /// is already current and the lock already held.
    pub fn navigate(&self, stage_id: u32) -> Result<bool> {
        if self.processing.is_busy() {
            return self.with_session(|s| s.navigate(stage_id));
        }
        let _guard = self.begin_processing()?;
        self.with_session(|s| s.navigate(stage_id))
    }

    /// Wipe proposal, statuses and upload. Rejected while an agent is working.
    pub fn reset(&self) -> Result<()> {
        let _guard = self.begin_processing()?;
        self.with_session(|s| s.reset())
    }
}
