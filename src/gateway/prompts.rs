//! Prompt templates for the stage agents
//!
//! Each builder takes the slice of proposal state its agent needs and returns
//! the instruction text. Attachments and schemas are added by the gateway.

use crate::models::{LogicModel, ProposalState, ScoringMap};

/// Compliance Checker Agent instructions
pub fn compliance_prompt(org_profile: &str) -> String {
    format!(
        r#"You are the Compliance Checker Agent.
Analyze the provided solicitation (NOFO/BAA) and Organization Profile.

ORG PROFILE: {org_profile}

TASKS:
1. Verify applicant eligibility.
2. Identify disqualifiers and fatal flaws.
3. Extract deadlines, page limits, formatting rules.
4. List required attachments.
5. Extract scoring criteria and weights.

Return decision "GO" only if no blocking check fails.
If the solicitation is provided as a PDF attachment, prioritize its content."#,
        org_profile = org_profile
    )
}

/// Grant Architecture Agent instructions
pub fn architecture_prompt() -> String {
    r#"You are the Grant Architecture Agent.
Build a section outline mapped to scoring points and a Logic Model based on the solicitation.
Identify funder priority language to mirror.
Report the total available points, the competitive threshold as a percent,
the page limit, and every formatting requirement you find."#
        .to_string()
}

/// Solicitation text as its own part
pub fn solicitation_part(label: &str, nofo_text: &str) -> String {
    format!("{}: {}", label, nofo_text)
}

/// Narrative Drafting Agent instructions for a single section
pub fn narrative_prompt(section: &str, org_profile: &str, scoring_map: Option<&ScoringMap>) -> String {
    let mut prompt = format!(
        r#"You are the Narrative Drafting Agent.
Draft the proposal section "{section}" for the applicant below.
Write persuasive, reviewer-friendly prose that mirrors the funder's priority language.
Return only the section text, without headings or commentary.

ORG PROFILE: {org_profile}
"#,
        section = section,
        org_profile = org_profile
    );

    if let Some(map) = scoring_map {
        if let Some(found) = map.sections.iter().find(|s| s.name == section) {
            prompt.push_str(&format!(
                "\nSCORING WEIGHT: {} of {} points ({} subsections)\n",
                found.points, map.total_points, found.subsections
            ));
        }
        if map.page_limit > 0.0 {
            prompt.push_str(&format!(
                "PAGE LIMIT (whole narrative): {}\n",
                map.page_limit
            ));
        }
        if !map.format_requirements.is_empty() {
            prompt.push_str("FORMAT REQUIREMENTS:\n");
            for requirement in &map.format_requirements {
                prompt.push_str(&format!("- {}\n", requirement));
            }
        }
    }

    prompt
}

/// Budget & Allowability Agent instructions
pub fn budget_prompt(nofo_text: &str, logic_model: &LogicModel) -> String {
    let logic_model_json = serde_json::to_string(logic_model).unwrap_or_default();
    let mut prompt = format!(
        r#"You are the Budget & Allowability Agent.
Build a budget by category tied to project activities.
Check allowability under 2 CFR 200. Amounts are non-negative US dollars.
Logic Model: {logic_model}"#,
        logic_model = logic_model_json
    );
    if !nofo_text.trim().is_empty() {
        prompt.push_str(&format!("\nSolicitation: {}", nofo_text));
    }
    prompt
}

/// Red Team Agent instructions with the whole proposal snapshot
pub fn red_team_prompt(proposal: &ProposalState) -> String {
    // The Q&A history is not part of the proposal package
    let mut snapshot = proposal.clone();
    snapshot.chat.clear();
    let data = serde_json::to_string(&snapshot).unwrap_or_default();

    format!(
        r#"You are the Red Team Agent.
Re-score the proposal based on the architecture and identify weak areas.
Give every fix a severity of high, medium or low, and a one-line readiness verdict.
Data: {data}"#,
        data = data
    )
}

/// Free-form question about the current proposal
pub fn chat_prompt(question: &str, proposal: &ProposalState) -> String {
    let mut prompt = String::from(
        "You are the Master Orchestrator of a federal grant proposal factory.\n\
         Answer the user's question concisely.\n",
    );
    prompt.push_str(&format!("\nORG PROFILE: {}\n", proposal.org_profile));
    if let Some(decision) = proposal.go_no_go {
        prompt.push_str(&format!("GO/NO-GO: {}\n", decision));
    }
    if let Some(map) = &proposal.scoring_map {
        let sections: Vec<&str> = map.section_names().collect();
        prompt.push_str(&format!("SECTIONS: {}\n", sections.join(", ")));
    }
    prompt.push_str(&format!("\nQUESTION: {}", question));
    prompt
}
