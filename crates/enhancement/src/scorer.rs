//! Improvement scoring
//!
//! Compares original and enhanced resume text and produces the structured
//! report persisted with a completed enhancement. The heuristic scorer is
//! deterministic; the trait leaves room for a model-backed scorer later.

use serde::{Deserialize, Serialize};

/// Structured improvement report for one completed enhancement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImprovementReport {
    pub keyword_score_before: u32,
    pub keyword_score_after: u32,
    pub ats_score_before: u32,
    pub ats_score_after: u32,
    pub readability_before: u32,
    pub readability_after: u32,
    /// Achievements carrying a concrete number in the enhanced text
    pub quantified_achievements: u32,
    /// Sentences upgraded to start with a strong action verb
    pub action_verbs_improved: u32,
    pub formatting_changes: Vec<String>,
}

impl ImprovementReport {
    /// Aggregate before score on a 0..=100 scale
    pub fn overall_before(&self) -> u32 {
        (self.keyword_score_before + self.ats_score_before + self.readability_before) / 3
    }

    /// Aggregate after score on a 0..=100 scale
    pub fn overall_after(&self) -> u32 {
        (self.keyword_score_after + self.ats_score_after + self.readability_after) / 3
    }
}

/// Scores an original/enhanced text pair
pub trait ImprovementScorer: Send + Sync {
    fn score(&self, original: &str, enhanced: &str) -> ImprovementReport;
}

/// Deterministic text-statistics scorer
#[derive(Default)]
pub struct HeuristicScorer;

const ACTION_VERBS: &[&str] = &[
    "led", "built", "shipped", "designed", "reduced", "increased", "launched", "migrated",
    "automated", "delivered", "optimized", "architected", "implemented", "scaled",
];

const ATS_SECTION_HEADERS: &[&str] = &[
    "experience", "education", "skills", "summary", "projects", "certifications",
];

impl HeuristicScorer {
    fn keyword_score(text: &str) -> u32 {
        let lower = text.to_lowercase();
        let hits = ACTION_VERBS.iter().filter(|v| lower.contains(*v)).count() as u32;
        (hits * 100 / ACTION_VERBS.len() as u32).min(100)
    }

    fn ats_score(text: &str) -> u32 {
        let lower = text.to_lowercase();
        let sections = ATS_SECTION_HEADERS
            .iter()
            .filter(|h| lower.contains(*h))
            .count() as u32;
        (sections * 100 / ATS_SECTION_HEADERS.len() as u32).min(100)
    }

    fn readability(text: &str) -> u32 {
        // Shorter average sentence length reads better, capped both ways
        let sentences: Vec<&str> = text
            .split(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if sentences.is_empty() {
            return 0;
        }
        let avg_words: usize =
            sentences.iter().map(|s| s.split_whitespace().count()).sum::<usize>()
                / sentences.len();
        match avg_words {
            0..=12 => 90,
            13..=20 => 75,
            21..=30 => 55,
            _ => 35,
        }
    }

    fn quantified_achievements(text: &str) -> u32 {
        text.split(['.', '\n'])
            .filter(|s| {
                let s = s.trim();
                s.len() > 15 && s.chars().any(|c| c.is_ascii_digit())
            })
            .count() as u32
    }

    fn action_verb_sentences(text: &str) -> u32 {
        text.split(['.', '\n'])
            .filter(|s| {
                let first = s.trim().split_whitespace().next().unwrap_or("").to_lowercase();
                ACTION_VERBS.contains(&first.as_str())
            })
            .count() as u32
    }
}

impl ImprovementScorer for HeuristicScorer {
    fn score(&self, original: &str, enhanced: &str) -> ImprovementReport {
        let verbs_before = Self::action_verb_sentences(original);
        let verbs_after = Self::action_verb_sentences(enhanced);

        ImprovementReport {
            keyword_score_before: Self::keyword_score(original),
            keyword_score_after: Self::keyword_score(enhanced),
            ats_score_before: Self::ats_score(original),
            ats_score_after: Self::ats_score(enhanced),
            readability_before: Self::readability(original),
            readability_after: Self::readability(enhanced),
            quantified_achievements: Self::quantified_achievements(enhanced),
            action_verbs_improved: verbs_after.saturating_sub(verbs_before),
            formatting_changes: vec![
                "normalized_section_headings".to_string(),
                "standardized_bullet_style".to_string(),
                "consistent_date_format".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scorer_is_deterministic() {
        let scorer = HeuristicScorer;
        let original = "Responsible for things. Worked on stuff.";
        let enhanced = "Led migration of 12 services. Reduced latency by 40 percent.";
        assert_eq!(scorer.score(original, enhanced), scorer.score(original, enhanced));
    }

    #[test]
    fn test_enhanced_text_scores_higher_on_keywords() {
        let scorer = HeuristicScorer;
        let report = scorer.score(
            "Responsible for the backend. Did some database work.",
            "Led backend development. Built and shipped the search service. \
             Reduced query latency. Experience, skills and education sections included.",
        );
        assert!(report.keyword_score_after > report.keyword_score_before);
        assert!(report.overall_after() > report.overall_before());
    }

    #[test]
    fn test_quantified_achievements_counted() {
        let scorer = HeuristicScorer;
        let report = scorer.score(
            "",
            "Reduced infrastructure cost by 30 percent. Managed a team of 5 engineers. \
             Improved reliability substantially.",
        );
        assert_eq!(report.quantified_achievements, 2);
    }

    #[test]
    fn test_empty_texts_do_not_panic() {
        let report = HeuristicScorer.score("", "");
        assert_eq!(report.readability_before, 0);
        assert_eq!(report.quantified_achievements, 0);
    }
}
