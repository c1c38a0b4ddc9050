//! WorkflowSession - exclusive owner of the proposal record and workflow progress
//!
//! All mutation goes through this type. Every change is written through to the
//! store immediately, so the on-disk slots are always the source of truth for
//! the next process.

use super::store::{Store, PROPOSAL_KEY, WORKFLOW_KEY};
use crate::error::WorkflowError;
use crate::models::stage::{self, StageStatus};
use crate::models::{ProposalPatch, ProposalState};
use crate::workflow::tracker::{StageTracker, Successor};
use anyhow::{Context, Result};
use base64::Engine;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Maximum number of activity log entries kept
pub const LOG_CAPACITY: usize = 10;

/// Log line written on reset
pub const RESET_MESSAGE: &str = "System reset. Awaiting new solicitation.";

/// Solicitation document attached by the user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    /// Base64 of the PDF bytes
    pub base64: String,
}

/// Derived UI state persisted alongside the proposal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowProgress {
    #[serde(default)]
    pub stages: StageTracker,
    #[serde(default = "first_stage")]
    pub current_stage: u32,
    #[serde(default)]
    pub uploaded_file: Option<UploadedFile>,
    #[serde(default)]
    pub log: Vec<String>,
}

fn first_stage() -> u32 {
    stage::COMPLIANCE
}

impl Default for WorkflowProgress {
    fn default() -> Self {
        Self {
            stages: StageTracker::new(),
            current_stage: first_stage(),
            uploaded_file: None,
            log: Vec::new(),
        }
    }
}

/// Whether bytes look like a PDF document
pub fn is_pdf(name: &str, bytes: &[u8]) -> bool {
    let has_extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("pdf"));
    has_extension && bytes.starts_with(b"%PDF")
}

pub struct WorkflowSession {
    store: Store,
    proposal: ProposalState,
    progress: WorkflowProgress,
}

impl WorkflowSession {
    /// Load both slots from the store; unusable slots fall back to defaults
    pub fn load(store: Store) -> Self {
        let proposal = store.load_or_default(PROPOSAL_KEY);
        let mut progress: WorkflowProgress = store.load_or_default(WORKFLOW_KEY);
        if !progress.stages.can_navigate(progress.current_stage) {
            progress.current_stage = first_stage();
        }

        Self {
            store,
            proposal,
            progress,
        }
    }

    /// Re-read both slots, discarding the in-memory copy
    pub fn reload(&mut self) {
        let store = self.store.clone();
        *self = Self::load(store);
    }

    /// Read-only view of the proposal record
    pub fn proposal(&self) -> &ProposalState {
        &self.proposal
    }

    pub fn progress(&self) -> &WorkflowProgress {
        &self.progress
    }

    pub fn stages(&self) -> &StageTracker {
        &self.progress.stages
    }

    pub fn current_stage(&self) -> u32 {
        self.progress.current_stage
    }

    pub fn uploaded_file(&self) -> Option<&UploadedFile> {
        self.progress.uploaded_file.as_ref()
    }

    pub fn log(&self) -> &[String] {
        &self.progress.log
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Write both slots
    pub fn save(&self) -> Result<()> {
        self.store
            .save(PROPOSAL_KEY, &self.proposal)
            .context("Failed to save proposal state")?;
        self.store
            .save(WORKFLOW_KEY, &self.progress)
            .context("Failed to save workflow progress")?;
        Ok(())
    }

    // =========================================================================
    // Mutation API
    // =========================================================================

    /// Shallow-merge a partial update into the proposal record
    pub fn merge(&mut self, patch: ProposalPatch) -> Result<()> {
        self.proposal.merge(patch);
        self.save()
    }

    /// Replace one narrative section, leaving the others intact
    pub fn put_narrative(&mut self, section: &str, text: String) -> Result<()> {
        let patch = self.proposal.narrative_entry(section, text);
        self.merge(patch)
    }

    /// Set a stage's status, applying the unlock rules. Callers save.
    fn transition(
        &mut self,
        stage_id: u32,
        status: StageStatus,
    ) -> std::result::Result<Option<Successor>, WorkflowError> {
        let next = self
            .progress
            .stages
            .transition(stage_id, status, self.proposal.is_sbir)?;
        Ok(next)
    }

    /// Mark a stage complete and move the view to whatever it unlocked
    pub fn complete_stage(&mut self, stage_id: u32) -> Result<Option<u32>> {
        let next = self.transition(stage_id, StageStatus::Complete)?;
        let next_id = next.map(|s| s.next);
        if let Some(id) = next_id {
            self.progress.current_stage = id;
        }
        info!(stage = stage_id, next = ?next_id, "stage complete");
        self.save()?;
        Ok(next_id)
    }

    /// Open a stage; locked or unknown stages are ignored
    pub fn navigate(&mut self, stage_id: u32) -> Result<bool> {
        if !self.progress.stages.can_navigate(stage_id) {
            return Ok(false);
        }
        self.progress.current_stage = stage_id;
        self.save()?;
        Ok(true)
    }

    /// Append to the rolling activity log, dropping the oldest entries
    pub fn add_log(&mut self, message: impl AsRef<str>) -> Result<()> {
        let line = format!("[{}] {}", Local::now().format("%H:%M:%S"), message.as_ref());
        self.progress.log.push(line);
        let overflow = self.progress.log.len().saturating_sub(LOG_CAPACITY);
        if overflow > 0 {
            self.progress.log.drain(..overflow);
        }
        self.store
            .save(WORKFLOW_KEY, &self.progress)
            .context("Failed to save workflow progress")
    }

    pub fn set_solicitation_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.merge(ProposalPatch {
            nofo_text: Some(text.into()),
            ..Default::default()
        })
    }

    pub fn set_org_profile(&mut self, profile: impl Into<String>) -> Result<()> {
        self.merge(ProposalPatch {
            org_profile: Some(profile.into()),
            ..Default::default()
        })
    }

    pub fn set_sbir(&mut self, is_sbir: bool) -> Result<()> {
        self.merge(ProposalPatch {
            is_sbir: Some(is_sbir),
            ..Default::default()
        })
    }

    /// Attach a PDF solicitation. Returns false (and logs) for anything else.
    pub fn attach_document(&mut self, name: &str, bytes: &[u8]) -> Result<bool> {
        if !is_pdf(name, bytes) {
            self.add_log("Error: Only PDF files are supported.")?;
            return Ok(false);
        }

        self.progress.uploaded_file = Some(UploadedFile {
            name: name.to_string(),
            base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        });
        self.add_log(format!("PDF Uploaded: {}", name))?;
        Ok(true)
    }

    /// Read a PDF from disk and attach it
    pub fn attach_path(&mut self, path: &Path) -> Result<bool> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.pdf")
            .to_string();
        self.attach_document(&name, &bytes)
    }

    pub fn detach_document(&mut self) -> Result<()> {
        if let Some(file) = self.progress.uploaded_file.take() {
            self.add_log(format!("PDF removed: {}", file.name))?;
        }
        Ok(())
    }

    /// Replace everything with defaults: proposal, stage statuses, current stage and upload
    pub fn reset(&mut self) -> Result<()> {
        self.proposal = ProposalState::default();
        self.progress = WorkflowProgress {
            log: std::mem::take(&mut self.progress.log),
            ..WorkflowProgress::default()
        };
        self.save()?;
        self.add_log(RESET_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stage::*;
    use crate::models::Decision;
    use tempfile::TempDir;

    const PDF_BYTES: &[u8] = b"%PDF-1.7\n%fake body";

    fn setup_session() -> (TempDir, WorkflowSession) {
        let temp = TempDir::new().unwrap();
        let session = WorkflowSession::load(Store::new(temp.path().join("state")));
        (temp, session)
    }

    fn reload(session: &WorkflowSession) -> WorkflowSession {
        WorkflowSession::load(session.store().clone())
    }

    #[test]
    fn test_fresh_session_defaults() {
        let (_temp, session) = setup_session();
        assert_eq!(session.proposal(), &ProposalState::default());
        assert_eq!(session.current_stage(), COMPLIANCE);
        assert!(session.log().is_empty());
        assert!(session.uploaded_file().is_none());
    }

    #[test]
    fn test_edits_are_written_through() {
        let (_temp, mut session) = setup_session();
        session.set_solicitation_text("Agency X RFP, due in 30 days").unwrap();
        session.set_org_profile("Acme Inc, 10 employees").unwrap();
        session.set_sbir(false).unwrap();

        let reloaded = reload(&session);
        assert_eq!(reloaded.proposal().nofo_text, "Agency X RFP, due in 30 days");
        assert_eq!(reloaded.proposal().org_profile, "Acme Inc, 10 employees");
        assert!(!reloaded.proposal().is_sbir);
    }

    #[test]
    fn test_log_is_bounded() {
        let (_temp, mut session) = setup_session();
        for i in 0..15 {
            session.add_log(format!("entry {}", i)).unwrap();
        }
        assert_eq!(session.log().len(), LOG_CAPACITY);
        assert!(session.log()[0].ends_with("entry 5"));
        assert!(session.log()[9].ends_with("entry 14"));
        assert!(session.log()[0].starts_with('['));
    }

    #[test]
    fn test_complete_stage_moves_view() {
        let (_temp, mut session) = setup_session();
        let next = session.complete_stage(COMPLIANCE).unwrap();
        assert_eq!(next, Some(ARCHITECTURE));
        assert_eq!(session.current_stage(), ARCHITECTURE);

        let reloaded = reload(&session);
        assert_eq!(reloaded.stages().status(COMPLIANCE), StageStatus::Complete);
        assert_eq!(reloaded.current_stage(), ARCHITECTURE);
    }

    #[test]
    fn test_conditional_skip_is_persisted() {
        let (_temp, mut session) = setup_session();
        session.set_sbir(false).unwrap();
        session.complete_stage(COMPLIANCE).unwrap();
        session.complete_stage(ARCHITECTURE).unwrap();
        assert_eq!(session.complete_stage(NARRATIVE).unwrap(), Some(BUDGET));

        let reloaded = reload(&session);
        assert_eq!(reloaded.stages(), session.stages());
        assert_eq!(reloaded.stages().status(COMMERCIALIZATION), StageStatus::Skipped);
        assert_eq!(reloaded.stages().status(BUDGET), StageStatus::Active);
        assert_eq!(reloaded.current_stage(), BUDGET);
    }

    #[test]
    fn test_reload_picks_up_other_writers() {
        let (_temp, mut session) = setup_session();
        let mut other = reload(&session);
        other.set_solicitation_text("Written elsewhere").unwrap();
        other.complete_stage(COMPLIANCE).unwrap();

        assert_eq!(session.proposal().nofo_text, "");
        session.reload();
        assert_eq!(session.proposal().nofo_text, "Written elsewhere");
        assert_eq!(session.current_stage(), ARCHITECTURE);
    }

    #[test]
    fn test_navigate_locked_is_noop() {
        let (_temp, mut session) = setup_session();
        assert!(!session.navigate(BUDGET).unwrap());
        assert_eq!(session.current_stage(), COMPLIANCE);

        session.complete_stage(COMPLIANCE).unwrap();
        assert!(session.navigate(COMPLIANCE).unwrap());
        assert_eq!(session.current_stage(), COMPLIANCE);
    }

    #[test]
    fn test_put_narrative_replaces_section() {
        let (_temp, mut session) = setup_session();
        session.put_narrative("Technical Approach", "first".into()).unwrap();
        session.put_narrative("Technical Approach", "second".into()).unwrap();

        let narrative = &session.proposal().narrative;
        assert_eq!(narrative.len(), 1);
        assert_eq!(narrative["Technical Approach"], "second");
    }

    #[test]
    fn test_attach_pdf() {
        let (_temp, mut session) = setup_session();
        assert!(session.attach_document("nofo.pdf", PDF_BYTES).unwrap());

        let file = session.uploaded_file().unwrap();
        assert_eq!(file.name, "nofo.pdf");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&file.base64)
            .unwrap();
        assert_eq!(decoded, PDF_BYTES);
        assert!(session.log().last().unwrap().ends_with("PDF Uploaded: nofo.pdf"));
    }

    #[test]
    fn test_attach_rejects_non_pdf() {
        let (_temp, mut session) = setup_session();
        assert!(!session.attach_document("nofo.docx", b"PK\x03\x04").unwrap());
        assert!(!session.attach_document("fake.pdf", b"hello").unwrap());
        assert!(session.uploaded_file().is_none());
        assert!(session
            .log()
            .last()
            .unwrap()
            .ends_with("Error: Only PDF files are supported."));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let (_temp, mut session) = setup_session();
        session.set_solicitation_text("RFP").unwrap();
        session.attach_document("nofo.pdf", PDF_BYTES).unwrap();
        session
            .merge(ProposalPatch {
                go_no_go: Some(Decision::Go),
                ..Default::default()
            })
            .unwrap();
        session.complete_stage(COMPLIANCE).unwrap();

        session.reset().unwrap();

        assert_eq!(session.proposal(), &ProposalState::default());
        assert_eq!(session.stages(), &StageTracker::new());
        assert_eq!(session.current_stage(), COMPLIANCE);
        assert!(session.uploaded_file().is_none());
        assert!(session.log().last().unwrap().ends_with(RESET_MESSAGE));

        let reloaded = reload(&session);
        assert_eq!(reloaded.proposal(), &ProposalState::default());
        assert_eq!(reloaded.stages().status(COMPLIANCE), StageStatus::Active);
        for id in 2..=7 {
            assert_eq!(reloaded.stages().status(id), StageStatus::Locked);
        }
    }

    #[test]
    fn test_load_repairs_unreachable_current_stage() {
        let (_temp, session) = setup_session();
        let mut progress = WorkflowProgress::default();
        progress.current_stage = RED_TEAM;
        session.store().save(WORKFLOW_KEY, &progress).unwrap();

        let reloaded = reload(&session);
        assert_eq!(reloaded.current_stage(), COMPLIANCE);
    }
}
