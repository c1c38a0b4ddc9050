use crate::models::config::FACTORY_DIR;
use crate::workflow::export::format_currency;
use crate::Result;
use anyhow::Context;
use colored::Colorize;
use std::path::{Path, PathBuf};

pub fn default_output(project_root: &Path) -> PathBuf {
    project_root.join(FACTORY_DIR).join("proposal.md")
}

pub fn run(project_root: &Path, output: Option<PathBuf>) -> Result<()> {
    let factory = super::open_factory(project_root, false)?;
    let package = factory.finalize()?;

    let path = output.unwrap_or_else(|| default_output(project_root));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, &package.markdown)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{}", "📦 Proposal package ready".green().bold());
    println!("   Sections:   {}", package.sections);
    if let Some(limit) = package.page_limit {
        println!("   Page limit: {}", limit);
    }
    if let Some(score) = package.score {
        println!("   Score:      {}", score);
    }
    println!("   Budget:     {}", format_currency(package.budget_total));
    println!("   Written to: {}", path.display());
    Ok(())
}
