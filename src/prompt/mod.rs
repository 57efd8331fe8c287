//! Prompt construction for tutoring requests.
//!
//! A [`Request`] names what the learner wants (its [`RequestKind`]) and where
//! they are in the curriculum. [`build`] validates it and renders the prompt
//! through one pure function per kind, so identical inputs always produce
//! identical text.

mod templates;

use crate::curriculum::{CurriculumMap, DAYS_PER_WEEK};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Highest score accepted in a self-assessment
pub const MAX_ASSESSMENT_SCORE: u8 = 10;

/// Category of learner request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    CodeReview,
    ConceptExplanation,
    PracticeScenario,
    SkillsAssessment,
    InterviewPrep,
    LearningAnalysis,
}

impl RequestKind {
    pub const ALL: [RequestKind; 6] = [
        RequestKind::CodeReview,
        RequestKind::ConceptExplanation,
        RequestKind::PracticeScenario,
        RequestKind::SkillsAssessment,
        RequestKind::InterviewPrep,
        RequestKind::LearningAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::CodeReview => "code_review",
            RequestKind::ConceptExplanation => "concept_explanation",
            RequestKind::PracticeScenario => "practice_scenario",
            RequestKind::SkillsAssessment => "skills_assessment",
            RequestKind::InterviewPrep => "interview_prep",
            RequestKind::LearningAnalysis => "learning_analysis",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestKind::CodeReview => "Code Review",
            RequestKind::ConceptExplanation => "Concept Explanation",
            RequestKind::PracticeScenario => "Practice Scenario",
            RequestKind::SkillsAssessment => "Skills Assessment",
            RequestKind::InterviewPrep => "Interview Prep",
            RequestKind::LearningAnalysis => "Learning Analysis",
        }
    }

    /// Whether the request is meaningless without a payload
    pub fn requires_payload(&self) -> bool {
        matches!(self, RequestKind::CodeReview)
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        RequestKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| Error::validation(format!("unknown request kind: {}", s)))
    }
}

/// Optional per-kind refinements collected by the request forms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDetails {
    /// Language or tool of a code snippet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_objective: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_area: Option<String>,
    /// What the learner is working on, for learning analysis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<String>,
    /// Self-rated scores on a 1-10 scale, keyed by skill
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub self_assessment: BTreeMap<String, u8>,
}

/// A single learner ask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub kind: RequestKind,
    pub week: u32,
    pub day: u32,
    /// Code or question text, embedded verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default)]
    pub details: RequestDetails,
}

impl Request {
    pub fn new(kind: RequestKind, week: u32, day: u32) -> Self {
        Self {
            kind,
            week,
            day,
            payload: None,
            details: RequestDetails::default(),
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_details(mut self, details: RequestDetails) -> Self {
        self.details = details;
        self
    }

    /// Payload with blank text treated as absent
    pub fn payload_text(&self) -> Option<&str> {
        self.payload.as_deref().filter(|p| !p.trim().is_empty())
    }

    /// Check the request against the curriculum without rendering anything
    pub fn validate(&self, curriculum: &CurriculumMap) -> Result<()> {
        if !curriculum.contains_week(self.week) {
            return Err(Error::validation(format!(
                "week {} is outside the curriculum (1-{})",
                self.week,
                curriculum.week_count()
            )));
        }

        if self.day == 0 || self.day > DAYS_PER_WEEK {
            return Err(Error::validation(format!(
                "day {} is outside the week (1-{})",
                self.day, DAYS_PER_WEEK
            )));
        }

        if self.kind.requires_payload() && self.payload_text().is_none() {
            return Err(Error::validation(format!(
                "{} requires a payload",
                self.kind.label().to_lowercase()
            )));
        }

        for (skill, score) in &self.details.self_assessment {
            if *score == 0 || *score > MAX_ASSESSMENT_SCORE {
                return Err(Error::validation(format!(
                    "score for '{}' must be between 1 and {}",
                    skill, MAX_ASSESSMENT_SCORE
                )));
            }
        }

        Ok(())
    }
}

/// Render the prompt for a request
pub fn build(request: &Request, curriculum: &CurriculumMap) -> Result<String> {
    request.validate(curriculum)?;

    let week = curriculum.get_week(request.week)?;
    let pos = templates::Position {
        week,
        day: request.day,
        day_topic: curriculum.day_topic(request.week, request.day)?,
    };
    let details = &request.details;
    let payload = request.payload_text();

    let prompt = match request.kind {
        RequestKind::CodeReview => {
            // validate() guarantees the payload for this kind
            let code = payload.unwrap_or_default();
            templates::code_review(&pos, details, code)
        }
        RequestKind::ConceptExplanation => templates::concept_explanation(&pos, details, payload),
        RequestKind::PracticeScenario => templates::practice_scenario(&pos, details),
        RequestKind::SkillsAssessment => templates::skills_assessment(&pos, details),
        RequestKind::InterviewPrep => templates::interview_prep(
            &pos,
            details,
            &curriculum.technologies_through(request.week),
            &curriculum.concepts_through(request.week),
        ),
        RequestKind::LearningAnalysis => templates::learning_analysis(&pos, details, payload),
    };

    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str_variants() {
        assert_eq!(
            "code_review".parse::<RequestKind>().unwrap(),
            RequestKind::CodeReview
        );
        assert_eq!(
            "Interview-Prep".parse::<RequestKind>().unwrap(),
            RequestKind::InterviewPrep
        );
        assert_eq!(
            "learning analysis".parse::<RequestKind>().unwrap(),
            RequestKind::LearningAnalysis
        );
        assert!(matches!(
            "debugging".parse::<RequestKind>(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_kind_serde_is_snake_case() {
        let json = serde_json::to_string(&RequestKind::SkillsAssessment).unwrap();
        assert_eq!(json, "\"skills_assessment\"");

        let unknown: std::result::Result<RequestKind, _> = serde_json::from_str("\"quiz\"");
        assert!(unknown.is_err());
    }

    #[test]
    fn test_blank_payload_counts_as_absent() {
        let req = Request::new(RequestKind::CodeReview, 1, 1).with_payload("   \n");
        assert!(req.payload_text().is_none());
        assert!(matches!(
            req.validate(&CurriculumMap::builtin()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_validate_ranges() {
        let curriculum = CurriculumMap::builtin();
        assert!(Request::new(RequestKind::PracticeScenario, 0, 1)
            .validate(&curriculum)
            .is_err());
        assert!(Request::new(RequestKind::PracticeScenario, 7, 1)
            .validate(&curriculum)
            .is_err());
        assert!(Request::new(RequestKind::PracticeScenario, 3, 8)
            .validate(&curriculum)
            .is_err());
        assert!(Request::new(RequestKind::PracticeScenario, 6, 7)
            .validate(&curriculum)
            .is_ok());
    }

    #[test]
    fn test_validate_assessment_scores() {
        let curriculum = CurriculumMap::builtin();
        let mut details = RequestDetails::default();
        details.self_assessment.insert("Terraform".to_string(), 11);
        let req = Request::new(RequestKind::SkillsAssessment, 4, 1).with_details(details);
        assert!(matches!(req.validate(&curriculum), Err(Error::Validation(_))));
    }

    #[test]
    fn test_request_deserializes_without_details() {
        let req: Request =
            serde_json::from_str(r#"{"kind":"concept_explanation","week":2,"day":3}"#).unwrap();
        assert_eq!(req.payload, None);
        assert_eq!(req.details, RequestDetails::default());
    }
}
