use crate::models::stage;
use crate::models::{CheckStatus, FixSeverity};
use crate::workflow::export::format_currency;
use crate::workflow::Factory;
use crate::Result;
use colored::Colorize;
use std::future::Future;
use std::path::Path;

/// Run one agent operation behind a spinner
async fn with_spinner<T, F>(message: &str, op: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let pb = super::spinner(message);
    let result = op.await;
    pb.finish_and_clear();
    result
}

fn print_next(factory: &Factory, next: Option<u32>) {
    match next.and_then(stage::stage) {
        Some(s) => println!("{}", format!("→ Stage {} unlocked: {}", s.id, s.name).cyan()),
        None => {
            let finished = factory.with_session(|s| s.stages().is_finished());
            if finished {
                println!("{}", "🎉 All stages complete".green().bold());
            }
        }
    }
}

pub async fn compliance(project_root: &Path) -> Result<()> {
    let factory = super::open_factory(project_root, true)?;
    let result = with_spinner("Compliance Agent reviewing solicitation...", factory.run_compliance()).await?;

    let decision = result.decision.to_string();
    let decision = if result.decision.is_go() { decision.green() } else { decision.red() };
    println!("{} {}", "Decision:".bold(), decision.bold());
    println!("{}", result.rationale);
    println!();

    for check in &result.checks {
        let mark = match check.status {
            CheckStatus::Pass => "✓".green(),
            CheckStatus::Fail => "✗".red(),
            CheckStatus::Warning => "!".yellow(),
        };
        let blocking = if check.blocking { " [blocking]".red().to_string() } else { String::new() };
        println!(" {} {}{}", mark, check.item, blocking);
        if !check.reason.is_empty() {
            println!("     {}", check.reason.bright_black());
        }
    }

    if result.decision.is_go() {
        print_next(&factory, Some(stage::ARCHITECTURE));
    }
    Ok(())
}

pub async fn architecture(project_root: &Path) -> Result<()> {
    let factory = super::open_factory(project_root, true)?;
    let map = with_spinner("Mapping evaluation criteria...", factory.generate_architecture()).await?;

    println!(
        "{} {} points, {}% competitive threshold, {} page limit",
        "Scoring map:".bold(),
        map.total_points,
        map.competitive_threshold,
        map.page_limit
    );
    for section in &map.sections {
        println!("   • {:<40} {:>5}", section.name, section.points);
    }
    if let Some(model) = &map.logic_model {
        println!(
            "{} {} inputs, {} activities, {} outputs, {} outcomes",
            "Logic model:".bold(),
            model.inputs.len(),
            model.activities.len(),
            model.outputs.len(),
            model.outcomes.len()
        );
    }

    print_next(&factory, Some(stage::NARRATIVE));
    Ok(())
}

pub async fn draft(project_root: &Path, section: &str) -> Result<()> {
    let factory = super::open_factory(project_root, true)?;
    let text = with_spinner(&format!("Drafting {}...", section), factory.draft_section(section)).await?;

    println!("{}", format!("## {}", section).cyan().bold());
    println!("{}", text);

    let missing = factory.with_session(|s| s.proposal().undrafted_sections());
    if !missing.is_empty() {
        println!();
        println!("{} {}", "Still to draft:".yellow(), missing.join(", "));
    }
    Ok(())
}

pub fn approve_narrative(project_root: &Path) -> Result<()> {
    let factory = super::open_factory(project_root, false)?;
    let next = factory.approve_narrative()?;
    println!("{}", "✓ Narrative approved".green());
    print_next(&factory, next);
    Ok(())
}

pub fn commercialization(project_root: &Path) -> Result<()> {
    let factory = super::open_factory(project_root, false)?;
    let next = factory.complete_commercialization()?;
    println!("{}", "✓ Commercialization pathway complete".green());
    print_next(&factory, next);
    Ok(())
}

pub async fn budget(project_root: &Path) -> Result<()> {
    let factory = super::open_factory(project_root, true)?;
    let items = with_spinner("Budget Agent calculating allowability...", factory.generate_budget()).await?;

    for item in &items {
        let allowable = if item.allowable { "✓".green() } else { "✗".red() };
        println!(
            " {} {:<20} {:>14}  {}",
            allowable,
            item.category,
            format_currency(item.amount),
            item.description
        );
    }
    let total: f64 = items.iter().map(|i| i.amount).sum();
    println!("{} {}", "Total:".bold(), format_currency(total).bold());

    print_next(&factory, Some(stage::RED_TEAM));
    Ok(())
}

pub async fn red_team(project_root: &Path) -> Result<()> {
    let factory = super::open_factory(project_root, true)?;
    let review = with_spinner("Red Team Agent simulating peer review...", factory.run_red_team()).await?;

    println!("{} {}", "Estimated score:".bold(), review.estimated_score.to_string().cyan().bold());
    if let Some(verdict) = &review.readiness_verdict {
        println!("{}", verdict);
    }
    for fix in &review.fixes {
        let severity = match fix.severity {
            FixSeverity::High => "HIGH".red(),
            FixSeverity::Medium => "MEDIUM".yellow(),
            FixSeverity::Low => "LOW".bright_black(),
        };
        println!(" [{}] {}: {}", severity, fix.area.bold(), fix.recommendation);
    }

    print_next(&factory, Some(stage::SUBMISSION));
    Ok(())
}

pub fn goto(project_root: &Path, stage_id: u32) -> Result<()> {
    let factory = super::open_factory(project_root, false)?;
    let Some(target) = stage::stage(stage_id) else {
        anyhow::bail!("Unknown stage {}", stage_id);
    };

    if factory.navigate(stage_id)? {
        println!("{}", format!("▶ Stage {}: {}", target.id, target.name).cyan());
    } else {
        println!("{}", format!("Stage {} is locked", stage_id).yellow());
    }
    Ok(())
}
