use crate::models::stage::{self, StageStatus};
use crate::models::STAGES;
use crate::state::WorkflowSession;
use crate::Result;
use colored::{ColoredString, Colorize};
use serde_json::json;
use std::path::Path;

fn colored_status(status: StageStatus) -> ColoredString {
    match status {
        StageStatus::Locked => status.name().bright_black(),
        StageStatus::Active => status.name().cyan(),
        StageStatus::Complete => status.name().green(),
        StageStatus::Skipped => status.name().yellow(),
        StageStatus::Failed => status.name().red(),
    }
}

/// Machine-readable snapshot of the workflow
pub fn status_json(session: &WorkflowSession) -> serde_json::Value {
    let proposal = session.proposal();
    let stages: Vec<_> = STAGES
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "name": s.name,
                "status": session.stages().status(s.id),
            })
        })
        .collect();

    json!({
        "currentStage": session.current_stage(),
        "progress": session.stages().progress_percent(),
        "isSBIR": proposal.is_sbir,
        "goNoGo": proposal.go_no_go,
        "stages": stages,
        "uploadedFile": session.uploaded_file().map(|f| f.name.clone()),
        "sections": proposal.narrative.keys().collect::<Vec<_>>(),
        "budgetTotal": proposal.budget_total(),
        "redTeamScore": proposal.red_team_score,
    })
}

pub fn run(project_root: &Path, json: bool) -> Result<()> {
    let session = super::open_session(project_root)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status_json(&session))?);
        return Ok(());
    }

    let proposal = session.proposal();
    println!("{}", "Grant Factory".cyan().bold());
    println!(
        "   Progress:  {}% ({}/{} stages)",
        session.stages().progress_percent(),
        session.stages().completed_count(),
        STAGES.len()
    );
    println!(
        "   Mode:      {}",
        if proposal.is_sbir { "SBIR/STTR" } else { "Standard grant" }
    );
    if let Some(decision) = proposal.go_no_go {
        let label = decision.to_string();
        let label = if decision.is_go() { label.green() } else { label.red() };
        println!("   Decision:  {}", label.bold());
    }
    if let Some(file) = session.uploaded_file() {
        println!("   Document:  📄 {}", file.name);
    }
    println!();

    for s in STAGES {
        let status = session.stages().status(s.id);
        let marker = if s.id == session.current_stage() { "▶" } else { " " };
        println!(
            " {} {} {}. {:<34} {}",
            marker,
            status.emoji(),
            s.id,
            s.name,
            colored_status(status)
        );
    }

    if !proposal.narrative.is_empty() {
        println!();
        println!("{}", "Drafted sections:".bold());
        for name in proposal.narrative.keys() {
            println!("   • {}", name);
        }
    }

    Ok(())
}

/// Static list of stages and their agents
pub fn run_stages() -> Result<()> {
    for s in STAGES {
        let conditional = if s.conditional { " (SBIR only)".yellow().to_string() } else { String::new() };
        println!("{}. {}{}", s.id, s.name.bold(), conditional);
        println!("   {} - {}", s.agent.cyan(), s.description);
    }
    println!();
    println!(
        "{}",
        format!(
            "Stage {} decides whether stage {} runs.",
            stage::CONDITIONAL_GATE,
            stage::COMMERCIALIZATION
        )
        .bright_black()
    );
    Ok(())
}

/// Activity log, oldest first
pub fn run_log(project_root: &Path) -> Result<()> {
    let session = super::open_session(project_root)?;
    if session.log().is_empty() {
        println!("{}", "No activity yet.".bright_black());
    }
    for line in session.log() {
        if line.contains("Error") {
            println!("{}", line.red());
        } else {
            println!("{}", line);
        }
    }
    Ok(())
}
