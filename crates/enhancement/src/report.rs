//! Human-facing enhancement report
//!
//! Reconstructs a summary purely from a completed resume's stored state.
//! The only side effect is one summary log event.

use crate::scorer::ImprovementReport;
use pitchforge_common::db::models::{EnhancementState, Resume};
use pitchforge_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Summary returned to the caller for a completed enhancement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementSummary {
    pub resume_id: uuid::Uuid,
    pub score_before: u32,
    pub score_after: u32,
    pub processing_duration_secs: Option<i64>,
    pub quantified_achievements: u32,
    pub action_verbs_improved: u32,
    pub enhancements_applied: Vec<String>,
    pub enhanced_document_available: bool,
}

/// Build the summary from stored state
///
/// Fails unless the resume's enhancement is completed with a stored report.
pub fn build_report(resume: &Resume) -> Result<EnhancementSummary> {
    if resume.enhancement_state() != EnhancementState::Completed {
        return Err(AppError::EnhancementFailed {
            message: format!(
                "no completed enhancement for resume {} (state: {})",
                resume.id,
                String::from(resume.enhancement_state())
            ),
        });
    }

    let results = resume
        .enhancement_results
        .as_ref()
        .ok_or_else(|| AppError::EnhancementFailed {
            message: format!("completed enhancement for {} has no stored report", resume.id),
        })?;

    let report: ImprovementReport = serde_json::from_value(results["report"].clone())?;

    let mut enhancements = report.formatting_changes.clone();
    if report.keyword_score_after > report.keyword_score_before {
        enhancements.push("keyword_alignment".to_string());
    }
    if report.quantified_achievements > 0 {
        enhancements.push("quantified_achievements".to_string());
    }
    if report.action_verbs_improved > 0 {
        enhancements.push("stronger_action_verbs".to_string());
    }

    let summary = EnhancementSummary {
        resume_id: resume.id,
        score_before: report.overall_before(),
        score_after: report.overall_after(),
        processing_duration_secs: resume.enhancement_duration_secs(),
        quantified_achievements: report.quantified_achievements,
        action_verbs_improved: report.action_verbs_improved,
        enhancements_applied: enhancements,
        enhanced_document_available: resume.enhanced_storage_path.is_some(),
    };

    info!(
        resume_id = %summary.resume_id,
        score_before = summary.score_before,
        score_after = summary.score_after,
        duration_secs = summary.processing_duration_secs,
        "Enhancement report generated"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchforge_common::db::models::ResumeStatus;
    use uuid::Uuid;

    fn completed_resume() -> Resume {
        let started = chrono::Utc::now() - chrono::Duration::seconds(90);
        let completed = chrono::Utc::now();
        let report = ImprovementReport {
            keyword_score_before: 20,
            keyword_score_after: 60,
            ats_score_before: 30,
            ats_score_after: 80,
            readability_before: 55,
            readability_after: 75,
            quantified_achievements: 4,
            action_verbs_improved: 3,
            formatting_changes: vec!["normalized_section_headings".to_string()],
        };

        Resume {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            storage_path: "resumes/x.txt".to_string(),
            original_filename: "resume.txt".to_string(),
            file_type: "txt".to_string(),
            byte_size: 100,
            extracted_text: Some("text".to_string()),
            status: String::from(ResumeStatus::Ready),
            is_default: false,
            download_count: 0,
            last_used_at: None,
            last_downloaded_at: None,
            enhancement_status: String::from(EnhancementState::Completed),
            enhancement_started_at: Some(started.into()),
            enhancement_completed_at: Some(completed.into()),
            enhancement_error: None,
            enhancement_results: Some(serde_json::json!({
                "enhanced_text": "Enhanced.",
                "report": report,
            })),
            enhanced_storage_path: Some("enhanced/x.txt".to_string()),
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
        }
    }

    #[test]
    fn test_report_from_completed_resume() {
        let summary = build_report(&completed_resume()).unwrap();

        assert_eq!(summary.score_before, (20 + 30 + 55) / 3);
        assert_eq!(summary.score_after, (60 + 80 + 75) / 3);
        assert_eq!(summary.processing_duration_secs, Some(90));
        assert!(summary.enhanced_document_available);
        assert!(summary
            .enhancements_applied
            .contains(&"quantified_achievements".to_string()));
        assert!(summary
            .enhancements_applied
            .contains(&"stronger_action_verbs".to_string()));
    }

    #[test]
    fn test_report_rejects_incomplete_enhancement() {
        let mut resume = completed_resume();
        resume.enhancement_status = String::from(EnhancementState::Processing);

        let err = build_report(&resume).unwrap_err();
        assert!(matches!(err, AppError::EnhancementFailed { .. }));
    }

    #[test]
    fn test_report_is_a_pure_projection() {
        let resume = completed_resume();
        let a = build_report(&resume).unwrap();
        let b = build_report(&resume).unwrap();
        assert_eq!(a.score_after, b.score_after);
        assert_eq!(a.enhancements_applied, b.enhancements_applied);
    }
}
