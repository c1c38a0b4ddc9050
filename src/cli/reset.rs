use crate::Result;
use colored::Colorize;
use dialoguer::Confirm;
use std::path::Path;

pub fn run(project_root: &Path, yes: bool) -> Result<()> {
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt("Discard the proposal and all stage progress?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Reset cancelled");
            return Ok(());
        }
    }

    let factory = super::open_factory(project_root, false)?;
    factory.reset()?;
    println!("{}", "🔄 Workflow reset. Awaiting new solicitation.".cyan());
    Ok(())
}
