use crate::bid::{BidTracker, NewOpportunity};
use crate::models::bid::{
    BidStage, JourneyStatus, NotificationKind, OpportunitySource, Priority, TaskStatus,
};
use crate::Result;
use clap::{Subcommand, ValueEnum};
use colored::Colorize;
use std::path::Path;

#[derive(Subcommand)]
pub enum BidCommands {
    /// List tracked opportunities with their journeys
    List,

    /// Track a new opportunity
    Add {
        /// Opportunity title
        title: String,

        #[arg(long)]
        agency: String,

        /// Notice / funding opportunity number
        #[arg(long)]
        notice_id: String,

        /// Response due date
        #[arg(long)]
        due: String,

        #[arg(long, value_enum, default_value_t = OpportunitySource::GrantsGov)]
        source: OpportunitySource,

        #[arg(long, value_enum, default_value_t = BidStage::Solicitation)]
        stage: BidStage,

        #[arg(long, default_value_t = 0.0)]
        award: f64,

        #[arg(long)]
        naics: Option<String>,
    },

    /// Open (or resume) the journey for an opportunity
    Start {
        opportunity_id: String,
    },

    /// Set a journey status
    Journey {
        journey_id: String,

        #[arg(value_enum)]
        status: JourneyStatus,
    },

    /// Add a task to a journey
    Task {
        journey_id: String,
        title: String,

        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,

        #[arg(long)]
        deadline: String,
    },

    /// Set a task status
    Done {
        task_id: String,

        #[arg(long, value_enum, default_value_t = TaskStatus::Done)]
        status: TaskStatus,
    },

    /// Post a notification
    Notify {
        title: String,
        message: String,

        #[arg(long, value_enum, default_value_t = NotificationKind::System)]
        kind: NotificationKind,
    },

    /// Show notifications and mark them read
    Inbox,
}

/// Command-line name of a value, which is also its stored name
fn value_name<T: ValueEnum>(value: &T) -> String {
    value
        .to_possible_value()
        .map(|v| v.get_name().to_string())
        .unwrap_or_default()
}

pub fn run(project_root: &Path, cmd: BidCommands) -> Result<()> {
    let mut tracker = BidTracker::load(super::open_store(project_root)?);

    match cmd {
        BidCommands::List => {
            let state = tracker.state();
            if state.opportunities.is_empty() {
                println!("{}", "No opportunities tracked.".bright_black());
            }
            for opp in &state.opportunities {
                let active = state.active_opportunity_id.as_deref() == Some(opp.id.as_str());
                let marker = if active { "▶" } else { " " };
                println!("{} {} {}", marker, opp.title.bold(), format!("({})", opp.agency).bright_black());
                println!("     id: {}  due: {}  notice: {}", opp.id, opp.due_date, opp.notice_id);
                if let Some(journey) = state.journeys.iter().find(|j| j.opportunity_id == opp.id) {
                    let tasks = tracker.tasks_for(&journey.id);
                    println!(
                        "     journey {} [{:?}] {} task(s)",
                        journey.id,
                        journey.status,
                        tasks.len()
                    );
                }
            }
            let unread = tracker.unread_count();
            if unread > 0 {
                println!();
                println!("{}", format!("🔔 {} unread notification(s)", unread).yellow());
            }
        }

        BidCommands::Add {
            title,
            agency,
            notice_id,
            due,
            source,
            stage,
            award,
            naics,
        } => {
            let opp = tracker.add_opportunity(NewOpportunity {
                source,
                notice_id,
                title,
                agency,
                due_date: due,
                description: String::new(),
                bid_stage: stage,
                estimated_award: award,
                naics,
            })?;
            println!("{}", format!("✓ Tracking {} ({})", opp.title, opp.id).green());
        }

        BidCommands::Start { opportunity_id } => {
            let journey = tracker.start_journey(&opportunity_id)?;
            println!("{}", format!("▶ Journey {} active", journey.id).cyan());
        }

        BidCommands::Journey { journey_id, status } => {
            tracker.set_journey_status(&journey_id, status)?;
            println!(
                "{}",
                format!("✓ Journey {} is now {}", journey_id, value_name(&status)).green()
            );
        }

        BidCommands::Task {
            journey_id,
            title,
            priority,
            deadline,
        } => {
            let task = tracker.add_task(&journey_id, &title, priority, &deadline)?;
            println!("{}", format!("✓ Task {} added", task.id).green());
        }

        BidCommands::Done { task_id, status } => {
            tracker.set_task_status(&task_id, status)?;
            println!(
                "{}",
                format!("✓ Task {} is now {}", task_id, value_name(&status)).green()
            );
        }

        BidCommands::Notify { title, message, kind } => {
            tracker.notify(kind, &title, &message)?;
            println!("{}", "🔔 Notification posted".green());
        }

        BidCommands::Inbox => {
            for n in &tracker.state().notifications {
                let title = if n.read { n.title.normal() } else { n.title.bold() };
                println!("{} {}", n.timestamp.bright_black(), title);
                println!("   {}", n.message);
            }
            tracker.mark_all_read()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct BidCli {
        #[command(subcommand)]
        command: BidCommands,
    }

    fn parse(args: &[&str]) -> std::result::Result<BidCommands, clap::Error> {
        let argv = std::iter::once("bid").chain(args.iter().copied());
        BidCli::try_parse_from(argv).map(|cli| cli.command)
    }

    #[test]
    fn test_add_defaults() {
        let cmd = parse(&["add", "SBIR Phase I", "--agency", "NSF", "--notice-id", "24-579", "--due", "2026-06-01"])
            .unwrap();
        match cmd {
            BidCommands::Add { source, stage, award, .. } => {
                assert_eq!(source, OpportunitySource::GrantsGov);
                assert_eq!(stage, BidStage::Solicitation);
                assert_eq!(award, 0.0);
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_wire_names_accepted() {
        let cmd = parse(&[
            "add", "Title", "--agency", "DoD", "--notice-id", "N1", "--due", "2026-01-01",
            "--source", "sam.gov", "--stage", "PRE_SOLICITATION",
        ])
        .unwrap();
        assert!(matches!(
            cmd,
            BidCommands::Add {
                source: OpportunitySource::SamGov,
                stage: BidStage::PreSolicitation,
                ..
            }
        ));

        let cmd = parse(&["journey", "j1", "autopilot_complete"]).unwrap();
        assert!(matches!(
            cmd,
            BidCommands::Journey { status: JourneyStatus::AutopilotComplete, .. }
        ));

        let cmd = parse(&["done", "t1", "--status", "in-progress"]).unwrap();
        assert!(matches!(cmd, BidCommands::Done { status: TaskStatus::InProgress, .. }));

        let cmd = parse(&["notify", "Won", "Awarded", "--kind", "award"]).unwrap();
        assert!(matches!(cmd, BidCommands::Notify { kind: NotificationKind::Award, .. }));
    }

    #[test]
    fn test_unknown_values_rejected_at_parse() {
        let err = parse(&["task", "j1", "Write", "--deadline", "2026-01-01", "--priority", "urgent"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
        assert!(parse(&["journey", "j1", "in-progress"]).is_err());
    }

    #[test]
    fn test_value_name_is_stored_name() {
        assert_eq!(value_name(&TaskStatus::ToDo), "to-do");
        assert_eq!(value_name(&JourneyStatus::InProgress), "in_progress");
    }
}
