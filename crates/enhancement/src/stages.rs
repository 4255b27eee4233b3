//! Fixed stage sequence for the enhancement pipeline
//!
//! Progress percentages are strictly increasing and the sequence never
//! varies, so pollers can rely on stage names and ordering.

use serde_json::json;

/// One named pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    /// Machine-readable stage name
    pub name: &'static str,
    /// Progress percentage reported when this stage runs
    pub progress: i32,
    /// Human-readable description for the event log
    pub description: &'static str,
}

/// The fixed stage sequence, in execution order
pub const STAGES: [Stage; 5] = [
    Stage {
        name: "keyword_extraction",
        progress: 15,
        description: "Extracting role keywords and matching them against the resume",
    },
    Stage {
        name: "ats_compatibility",
        progress: 35,
        description: "Checking section structure and formatting for ATS parsers",
    },
    Stage {
        name: "achievement_quantification",
        progress: 55,
        description: "Rewriting achievements with concrete numbers where evidence exists",
    },
    Stage {
        name: "formatting_normalization",
        progress: 75,
        description: "Normalizing headings, bullets, and date formats",
    },
    Stage {
        name: "final_pass",
        progress: 95,
        description: "Final grammar and consistency pass over the enhanced text",
    },
];

impl Stage {
    /// Structured technical sub-details attached to this stage's event
    pub fn details(&self) -> serde_json::Value {
        match self.name {
            "keyword_extraction" => json!({
                "checks": ["skill_vocabulary_match", "title_alignment"],
            }),
            "ats_compatibility" => json!({
                "checks": ["section_headers", "table_free_layout", "standard_fonts"],
            }),
            "achievement_quantification" => json!({
                "checks": ["metric_presence", "impact_statements"],
            }),
            "formatting_normalization" => json!({
                "checks": ["bullet_style", "date_format", "heading_case"],
            }),
            "final_pass" => json!({
                "checks": ["grammar", "tense_consistency", "duplicate_phrases"],
            }),
            _ => json!({}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_strictly_increasing() {
        let mut prev = 0;
        for stage in &STAGES {
            assert!(stage.progress > prev);
            assert!(stage.progress < 100);
            prev = stage.progress;
        }
    }

    #[test]
    fn test_stage_names_are_unique() {
        let mut names: Vec<&str> = STAGES.iter().map(|s| s.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), STAGES.len());
    }

    #[test]
    fn test_every_stage_has_details() {
        for stage in &STAGES {
            let details = stage.details();
            assert!(details.get("checks").is_some(), "stage {}", stage.name);
        }
    }
}
