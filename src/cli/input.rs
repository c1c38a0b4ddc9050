use crate::state::{StateLock, WorkflowSession};
use crate::Result;
use anyhow::{bail, Context};
use clap::Subcommand;
use colored::Colorize;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum InputCommands {
    /// Set the solicitation (NOFO) text
    Text {
        /// Solicitation text; reads stdin when omitted and no --file is given
        text: Option<String>,

        /// Read the text from a file
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },

    /// Set the organization profile
    Profile {
        /// Profile text
        text: Option<String>,

        /// Read the profile from a file
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },

    /// Toggle SBIR/STTR mode (controls the commercialization stage)
    Sbir {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },

    /// Attach the solicitation PDF
    Attach {
        path: PathBuf,
    },

    /// Remove the attached PDF
    Detach,
}

fn read_text(text: Option<String>, file: Option<PathBuf>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()));
    }

    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read stdin")?;
    Ok(buf)
}

pub fn run(project_root: &Path, cmd: InputCommands) -> Result<()> {
    let store = super::open_store(project_root)?;
    let _lock = StateLock::acquire(store.dir())?;
    let mut session = WorkflowSession::load(store);

    match cmd {
        InputCommands::Text { text, file } => {
            let text = read_text(text, file)?;
            let chars = text.len();
            session.set_solicitation_text(text)?;
            println!("{}", format!("✓ Solicitation text saved ({} chars)", chars).green());
        }
        InputCommands::Profile { text, file } => {
            session.set_org_profile(read_text(text, file)?)?;
            println!("{}", "✓ Organization profile saved".green());
        }
        InputCommands::Sbir { enabled } => {
            session.set_sbir(enabled)?;
            let mode = if enabled { "SBIR/STTR" } else { "standard grant" };
            println!("{}", format!("✓ Mode set to {}", mode).green());
        }
        InputCommands::Attach { path } => {
            if !session.attach_path(&path)? {
                bail!("Only PDF files are supported: {}", path.display());
            }
            println!("{}", format!("📄 Attached {}", path.display()).green());
        }
        InputCommands::Detach => {
            session.detach_document()?;
            println!("{}", "✓ Document removed".green());
        }
    }

    Ok(())
}
