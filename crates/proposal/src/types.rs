//! Request types for proposal generation

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A job posting the freelancer wants to bid on
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JobPosting {
    #[validate(length(min = 1, max = 300))]
    pub title: String,

    #[validate(length(min = 1, max = 20000))]
    pub description: String,

    #[serde(default)]
    pub skills: Vec<String>,

    #[serde(default)]
    pub screening_questions: Vec<String>,
}

/// Freelancer profile context, all fields optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FreelancerProfile {
    pub specialization: Option<String>,
    pub years_of_experience: Option<u32>,
    pub hourly_rate: Option<f64>,
    pub availability: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub bio: Option<String>,
}

/// One portfolio item offered as supporting evidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioItem {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub url: Option<String>,
}

/// Tuning knobs for one generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalSettings {
    /// Tone hint passed to the model: professional, friendly, confident
    #[serde(default = "default_tone")]
    pub tone: String,

    /// Target proposal length hint in words
    #[serde(default = "default_length")]
    pub target_words: u32,
}

fn default_tone() -> String {
    "professional".to_string()
}

fn default_length() -> u32 {
    250
}

impl Default for ProposalSettings {
    fn default() -> Self {
        Self {
            tone: default_tone(),
            target_words: default_length(),
        }
    }
}

/// Full proposal generation request as received at the boundary
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProposalRequest {
    #[validate(nested)]
    pub job: JobPosting,

    #[serde(default)]
    pub profile: Option<FreelancerProfile>,

    #[serde(default)]
    pub portfolio: Vec<PortfolioItem>,

    #[serde(default)]
    pub settings: ProposalSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_with_defaults() {
        let json = r#"{"job":{"title":"Rust engineer","description":"Build an API"}}"#;
        let request: ProposalRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.job.title, "Rust engineer");
        assert!(request.job.skills.is_empty());
        assert!(request.profile.is_none());
        assert!(request.portfolio.is_empty());
        assert_eq!(request.settings.tone, "professional");
    }

    #[test]
    fn test_empty_title_fails_validation() {
        let request = ProposalRequest {
            job: JobPosting {
                title: String::new(),
                description: "desc".to_string(),
                skills: vec![],
                screening_questions: vec![],
            },
            profile: None,
            portfolio: vec![],
            settings: ProposalSettings::default(),
        };

        assert!(request.validate().is_err());
    }
}
