use crate::models::ChatRole;
use crate::Result;
use colored::Colorize;
use std::path::Path;

pub async fn ask(project_root: &Path, question: &str) -> Result<()> {
    let factory = super::open_factory(project_root, true)?;

    let pb = super::spinner("Orchestrator researching...");
    let answer = factory.ask(question).await;
    pb.finish_and_clear();

    println!("{}", answer?);
    Ok(())
}

/// Print the saved conversation
pub fn history(project_root: &Path) -> Result<()> {
    let session = super::open_session(project_root)?;
    let chat = &session.proposal().chat;
    if chat.is_empty() {
        println!("{}", "No questions asked yet.".bright_black());
    }

    for message in chat {
        let who = match message.role {
            ChatRole::User => "you".cyan().bold(),
            ChatRole::Model => "orchestrator".green().bold(),
        };
        println!("{} {}", who, message.at.format("%Y-%m-%d %H:%M").to_string().bright_black());
        println!("{}", message.text);
        println!();
    }
    Ok(())
}
