//! Prompt assembler
//!
//! Pure, deterministic rendering of the generation prompt. Optional context
//! degrades gracefully: a missing profile or empty snippet list still yields
//! a valid prompt. No network, no side effects.

use crate::retrieval::Snippet;
use crate::types::{FreelancerProfile, JobPosting, PortfolioItem, ProposalSettings};
use pitchforge_common::db::question_hash;
use std::collections::HashMap;
use std::fmt::Write;

/// Portfolio items included per prompt, after relevance filtering
pub const MAX_PORTFOLIO_ITEMS: usize = 3;

/// System and user prompt pair for one generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub system: String,
    pub user: String,
}

/// Render the full prompt for a proposal
///
/// `cached_answers` maps question hashes (see [`question_hash`]) to answers
/// the freelancer has given before.
pub fn assemble(
    job: &JobPosting,
    snippets: &[Snippet],
    profile: Option<&FreelancerProfile>,
    portfolio: &[PortfolioItem],
    cached_answers: &HashMap<String, String>,
    settings: &ProposalSettings,
) -> AssembledPrompt {
    let system = format!(
        "You are an expert freelance proposal writer. Write a {} proposal of \
         about {} words. Ground every claim in the freelancer context provided; \
         never invent experience that is not in the context. Address the \
         client's needs directly and end with a clear next step.",
        settings.tone, settings.target_words
    );

    let mut user = String::new();

    writeln!(user, "# Job posting").ok();
    writeln!(user, "Title: {}", job.title).ok();
    writeln!(user, "Description: {}", job.description).ok();
    if !job.skills.is_empty() {
        writeln!(user, "Required skills: {}", job.skills.join(", ")).ok();
    }

    writeln!(user, "\n# Freelancer resume excerpts").ok();
    if snippets.is_empty() {
        writeln!(user, "No resume excerpts available.").ok();
    } else {
        for (i, snippet) in snippets.iter().enumerate() {
            writeln!(user, "{}. [{}] {}", i + 1, snippet.source, snippet.text).ok();
        }
    }

    writeln!(user, "\n# Freelancer profile").ok();
    match profile {
        Some(p) => render_profile(&mut user, p),
        None => {
            writeln!(user, "No profile available.").ok();
        }
    }

    let relevant = relevant_portfolio(job, portfolio);
    if !relevant.is_empty() {
        writeln!(user, "\n# Portfolio highlights").ok();
        for item in relevant {
            write!(user, "- {}: {}", item.title, item.description).ok();
            if let Some(ref url) = item.url {
                write!(user, " ({})", url).ok();
            }
            writeln!(user).ok();
        }
    }

    if !job.screening_questions.is_empty() {
        writeln!(user, "\n# Screening questions").ok();
        for question in &job.screening_questions {
            writeln!(user, "Q: {}", question).ok();
            if let Some(answer) = cached_answers.get(&question_hash(question)) {
                writeln!(user, "Previously given answer (reuse if still accurate): {}", answer)
                    .ok();
            }
        }
        writeln!(
            user,
            "Answer each screening question inside the proposal."
        )
        .ok();
    }

    AssembledPrompt { system, user }
}

fn render_profile(out: &mut String, profile: &FreelancerProfile) {
    if let Some(ref specialization) = profile.specialization {
        writeln!(out, "Specialization: {}", specialization).ok();
    }
    if let Some(years) = profile.years_of_experience {
        writeln!(out, "Years of experience: {}", years).ok();
    }
    if let Some(rate) = profile.hourly_rate {
        writeln!(out, "Hourly rate: ${:.2}/hr", rate).ok();
    }
    if let Some(ref availability) = profile.availability {
        writeln!(out, "Availability: {}", availability).ok();
    }
    if let Some(ref location) = profile.location {
        writeln!(out, "Location: {}", location).ok();
    }
    if !profile.skills.is_empty() {
        writeln!(out, "Skills: {}", profile.skills.join(", ")).ok();
    }
    if let Some(ref bio) = profile.bio {
        writeln!(out, "Bio: {}", bio).ok();
    }
}

/// Filter portfolio items by overlap with the job, keeping document order
///
/// An item is relevant when one of its skills appears in the job's skill
/// list or its title/skills appear in the job description.
fn relevant_portfolio<'a>(job: &JobPosting, portfolio: &'a [PortfolioItem]) -> Vec<&'a PortfolioItem> {
    let job_skills: Vec<String> = job.skills.iter().map(|s| s.to_lowercase()).collect();
    let description = job.description.to_lowercase();

    let mut relevant: Vec<&PortfolioItem> = portfolio
        .iter()
        .filter(|item| {
            item.skills.iter().any(|skill| {
                let skill = skill.to_lowercase();
                job_skills.contains(&skill) || description.contains(&skill)
            }) || description.contains(&item.title.to_lowercase())
        })
        .collect();

    // Fall back to the first items when nothing matches, rather than
    // dropping the portfolio entirely.
    if relevant.is_empty() {
        relevant = portfolio.iter().take(MAX_PORTFOLIO_ITEMS).collect();
    }

    relevant.truncate(MAX_PORTFOLIO_ITEMS);
    relevant
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> JobPosting {
        JobPosting {
            title: "Rust backend engineer".to_string(),
            description: "Build a low-latency API in Rust with PostgreSQL.".to_string(),
            skills: vec!["rust".to_string(), "postgresql".to_string()],
            screening_questions: vec!["What is your hourly rate?".to_string()],
        }
    }

    fn snippet(text: &str) -> Snippet {
        Snippet {
            text: text.to_string(),
            source: "resume".to_string(),
        }
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let snippets = vec![snippet("Shipped Rust microservices.")];
        let a = assemble(&job(), &snippets, None, &[], &HashMap::new(), &ProposalSettings::default());
        let b = assemble(&job(), &snippets, None, &[], &HashMap::new(), &ProposalSettings::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_degrades_without_optional_context() {
        let prompt = assemble(&job(), &[], None, &[], &HashMap::new(), &ProposalSettings::default());

        assert!(prompt.user.contains("No resume excerpts available."));
        assert!(prompt.user.contains("No profile available."));
        assert!(prompt.user.contains("Rust backend engineer"));
    }

    #[test]
    fn test_profile_fields_are_rendered() {
        let profile = FreelancerProfile {
            specialization: Some("Backend systems".to_string()),
            years_of_experience: Some(8),
            hourly_rate: Some(95.0),
            skills: vec!["rust".to_string()],
            ..Default::default()
        };
        let prompt = assemble(
            &job(),
            &[],
            Some(&profile),
            &[],
            &HashMap::new(),
            &ProposalSettings::default(),
        );

        assert!(prompt.user.contains("Specialization: Backend systems"));
        assert!(prompt.user.contains("Years of experience: 8"));
        assert!(prompt.user.contains("$95.00/hr"));
    }

    #[test]
    fn test_portfolio_capped_and_filtered() {
        let item = |title: &str, skill: &str| PortfolioItem {
            title: title.to_string(),
            description: "A project".to_string(),
            skills: vec![skill.to_string()],
            url: None,
        };
        let portfolio = vec![
            item("Crawler", "rust"),
            item("Dashboard", "react"),
            item("Billing service", "rust"),
            item("ETL pipeline", "postgresql"),
            item("Game", "unity"),
        ];

        let prompt = assemble(
            &job(),
            &[],
            None,
            &portfolio,
            &HashMap::new(),
            &ProposalSettings::default(),
        );

        // Three relevant items make the cut; the react and unity ones don't
        assert!(prompt.user.contains("Crawler"));
        assert!(prompt.user.contains("Billing service"));
        assert!(prompt.user.contains("ETL pipeline"));
        assert!(!prompt.user.contains("Dashboard"));
        assert!(!prompt.user.contains("Game"));
    }

    #[test]
    fn test_cached_answer_included_for_known_question() {
        let mut answers = HashMap::new();
        answers.insert(
            question_hash("What is your hourly rate?"),
            "My rate is $95/hr.".to_string(),
        );

        let prompt = assemble(&job(), &[], None, &[], &answers, &ProposalSettings::default());

        assert!(prompt.user.contains("Q: What is your hourly rate?"));
        assert!(prompt.user.contains("My rate is $95/hr."));
    }

    #[test]
    fn test_snippets_are_numbered_in_order() {
        let snippets = vec![snippet("First excerpt."), snippet("Second excerpt.")];
        let prompt = assemble(&job(), &snippets, None, &[], &HashMap::new(), &ProposalSettings::default());

        let first = prompt.user.find("1. [resume] First excerpt.").unwrap();
        let second = prompt.user.find("2. [resume] Second excerpt.").unwrap();
        assert!(first < second);
    }
}
