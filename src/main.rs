use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use grant_factory::cli::{bid::BidCommands, input::InputCommands};
use grant_factory::Result;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "grant-factory")]
#[command(author = "Chris Cheng <chris.cheng@shopee.com>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Staged grant proposal pipeline driven by AI agents", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory holding grant-factory/ (default: current directory)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Verbose diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show stage statuses and proposal summary
    Status {
        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },

    /// List the pipeline stages and their agents
    Stages,

    /// Edit proposal inputs
    #[command(subcommand)]
    Input(InputCommands),

    /// Open an unlocked stage
    Goto {
        stage: u32,
    },

    /// Stage 1: compliance check and Go/No-Go decision
    Compliance,

    /// Stage 2: scoring map and logic model
    Architecture,

    /// Stage 3: draft (or re-draft) a narrative section
    Draft {
        /// Section name, e.g. "Technical Approach"
        section: String,
    },

    /// Stage 3: approve the drafted narrative
    #[command(name = "approve-narrative")]
    ApproveNarrative,

    /// Stage 4: complete the SBIR commercialization pathway
    Commercialization,

    /// Stage 5: generate the budget
    Budget,

    /// Stage 6: simulated peer review
    #[command(name = "red-team")]
    RedTeam,

    /// Stage 7: build the submission package
    Finalize {
        /// Where to write the Markdown package
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Ask the orchestrator a question (web-grounded)
    Ask {
        question: String,
    },

    /// Show the saved conversation
    History,

    /// Discard the proposal and start over
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the activity log
    Log,

    /// Bid tracking: opportunities, journeys, tasks, notifications
    #[command(subcommand)]
    Bid(BidCommands),

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("grant_factory={}", default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}", format!("Error: Failed to create tokio runtime: {}", e).red());
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run_async(cli)) {
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}

async fn run_async(cli: Cli) -> Result<()> {
    let project_root = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let root = project_root.as_path();

    match cli.command {
        Commands::Status { json } => grant_factory::cli::status::run(root, json)?,
        Commands::Stages => grant_factory::cli::status::run_stages()?,
        Commands::Input(cmd) => grant_factory::cli::input::run(root, cmd)?,
        Commands::Goto { stage } => grant_factory::cli::stage::goto(root, stage)?,

        Commands::Compliance => {
            println!("{}", "🔍 Activating Compliance Agent...".cyan());
            grant_factory::cli::stage::compliance(root).await?;
        }
        Commands::Architecture => {
            println!("{}", "🏗  Activating Grant Architecture Agent...".cyan());
            grant_factory::cli::stage::architecture(root).await?;
        }
        Commands::Draft { section } => {
            println!("{}", format!("✍️  Drafting: {}", section).cyan());
            grant_factory::cli::stage::draft(root, &section).await?;
        }
        Commands::ApproveNarrative => grant_factory::cli::stage::approve_narrative(root)?,
        Commands::Commercialization => grant_factory::cli::stage::commercialization(root)?,
        Commands::Budget => {
            println!("{}", "💰 Activating Budget Agent...".cyan());
            grant_factory::cli::stage::budget(root).await?;
        }
        Commands::RedTeam => {
            println!("{}", "🛡  Activating Red Team Agent...".cyan());
            grant_factory::cli::stage::red_team(root).await?;
        }
        Commands::Finalize { output } => grant_factory::cli::finalize::run(root, output)?,

        Commands::Ask { question } => grant_factory::cli::chat::ask(root, &question).await?,
        Commands::History => grant_factory::cli::chat::history(root)?,
        Commands::Reset { yes } => grant_factory::cli::reset::run(root, yes)?,
        Commands::Log => grant_factory::cli::status::run_log(root)?,
        Commands::Bid(cmd) => grant_factory::cli::bid::run(root, cmd)?,

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "grant-factory", &mut io::stdout());
        }
    }

    Ok(())
}
