//! Submission package rendering

use crate::models::{CheckStatus, FixSeverity, ProposalState};
use std::fmt::Write;

/// Checklist printed at the end of every package
pub const SUBMISSION_CHECKLIST: &[&str] = &[
    "Verified SF-424 application for Federal Assistance",
    "Compliance with font size and margin requirements",
    "All required attachments (Letters of support, biosketches) uploaded",
];

/// Final proposal package with its summary metrics
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPackage {
    pub markdown: String,
    pub sections: usize,
    pub page_limit: Option<f64>,
    pub score: Option<f64>,
    pub budget_total: f64,
}

fn check_mark(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "✅",
        CheckStatus::Fail => "❌",
        CheckStatus::Warning => "⚠️",
    }
}

fn severity_label(severity: FixSeverity) -> &'static str {
    match severity {
        FixSeverity::High => "HIGH",
        FixSeverity::Medium => "MEDIUM",
        FixSeverity::Low => "LOW",
    }
}

/// Format a dollar amount with thousands separators
pub fn format_currency(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let (sign, cents) = if cents < 0 { ("-", -cents) } else { ("", cents) };
    let dollars = (cents / 100).to_string();

    let mut grouped = String::new();
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// Render the whole proposal as Markdown
pub fn render_markdown(proposal: &ProposalState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Grant Proposal Package\n");
    let _ = writeln!(out, "**Applicant:** {}\n", proposal.org_profile);

    if let Some(decision) = proposal.go_no_go {
        let _ = writeln!(out, "## Compliance\n");
        let _ = writeln!(out, "**Decision:** {}\n", decision);
        if let Some(rationale) = &proposal.compliance_rationale {
            let _ = writeln!(out, "{}\n", rationale);
        }
        for check in &proposal.compliance_checks {
            let blocking = if check.blocking { " **(blocking)**" } else { "" };
            let _ = writeln!(
                out,
                "- {} {}{}: {}",
                check_mark(check.status),
                check.item,
                blocking,
                check.reason
            );
        }
        out.push('\n');
    }

    if let Some(map) = &proposal.scoring_map {
        let _ = writeln!(out, "## Scoring Architecture\n");
        let _ = writeln!(
            out,
            "Total points: {} | Competitive threshold: {}% | Page limit: {}\n",
            map.total_points, map.competitive_threshold, map.page_limit
        );
        let _ = writeln!(out, "| Section | Points |\n|---|---|");
        for section in &map.sections {
            let _ = writeln!(out, "| {} | {} |", section.name, section.points);
        }
        out.push('\n');
    }

    if !proposal.narrative.is_empty() {
        let _ = writeln!(out, "## Narrative\n");
        // Follow scoring-map order where known, then anything else
        let mut ordered: Vec<&str> = proposal
            .scoring_map
            .iter()
            .flat_map(|m| m.section_names())
            .filter(|name| proposal.narrative.contains_key(*name))
            .collect();
        for name in proposal.narrative.keys() {
            if !ordered.contains(&name.as_str()) {
                ordered.push(name);
            }
        }
        for name in ordered {
            let _ = writeln!(out, "### {}\n\n{}\n", name, proposal.narrative[name]);
        }
    }

    if !proposal.budget.is_empty() {
        let _ = writeln!(out, "## Budget\n");
        let _ = writeln!(out, "| Category | Description | Amount | Allowable |\n|---|---|---|---|");
        for item in &proposal.budget {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                item.category,
                item.description,
                format_currency(item.amount),
                if item.allowable { "yes" } else { "no" }
            );
        }
        let _ = writeln!(out, "\n**Total:** {}\n", format_currency(proposal.budget_total()));
    }

    if let Some(score) = proposal.red_team_score {
        let _ = writeln!(out, "## Red Team Review\n");
        let _ = writeln!(out, "**Estimated score:** {}\n", score);
        if let Some(verdict) = &proposal.readiness_verdict {
            let _ = writeln!(out, "{}\n", verdict);
        }
        for fix in &proposal.red_team_fixes {
            let _ = writeln!(
                out,
                "- [{}] {}: {}",
                severity_label(fix.severity),
                fix.area,
                fix.recommendation
            );
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## Final Submission Checklist\n");
    for item in SUBMISSION_CHECKLIST {
        let _ = writeln!(out, "- [ ] {}", item);
    }

    out
}

pub fn build_package(proposal: &ProposalState) -> ExportPackage {
    ExportPackage {
        markdown: render_markdown(proposal),
        sections: proposal.narrative.len(),
        page_limit: proposal.scoring_map.as_ref().map(|m| m.page_limit),
        score: proposal.red_team_score,
        budget_total: proposal.budget_total(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetItem, Decision, ScoringMap, ScoringSection};

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.5), "$999.50");
        assert_eq!(format_currency(1234567.891), "$1,234,567.89");
        assert_eq!(format_currency(100000.0), "$100,000.00");
    }

    #[test]
    fn test_empty_proposal_has_checklist_only() {
        let md = render_markdown(&ProposalState::default());
        assert!(md.contains("# Grant Proposal Package"));
        assert!(md.contains("- [ ] Verified SF-424"));
        assert!(!md.contains("## Budget"));
    }

    #[test]
    fn test_package_metrics_and_section_order() {
        let mut proposal = ProposalState::default();
        proposal.go_no_go = Some(Decision::Go);
        proposal.scoring_map = Some(ScoringMap {
            sections: vec![
                ScoringSection { name: "Need".into(), points: 20.0, subsections: 0.0 },
                ScoringSection { name: "Approach".into(), points: 40.0, subsections: 0.0 },
            ],
            page_limit: 12.0,
            ..Default::default()
        });
        proposal.narrative.insert("Approach".into(), "B".into());
        proposal.narrative.insert("Need".into(), "A".into());
        proposal.budget.push(BudgetItem {
            category: "Personnel".into(),
            description: "PI".into(),
            amount: 1500.0,
            justification: String::new(),
            allowable: true,
        });
        proposal.red_team_score = Some(88.0);

        let package = build_package(&proposal);
        assert_eq!(package.sections, 2);
        assert_eq!(package.page_limit, Some(12.0));
        assert_eq!(package.score, Some(88.0));
        assert_eq!(package.budget_total, 1500.0);

        let need = package.markdown.find("### Need").unwrap();
        let approach = package.markdown.find("### Approach").unwrap();
        assert!(need < approach);
        assert!(package.markdown.contains("**Total:** $1,500.00"));
        assert!(package.markdown.contains("**Decision:** GO"));
    }
}
