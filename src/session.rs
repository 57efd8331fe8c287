//! Per-process session state.

use crate::curriculum::{CurriculumMap, DAYS_PER_WEEK};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Where the learner currently is in the curriculum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub week: u32,
    pub day: u32,
}

impl Default for Position {
    fn default() -> Self {
        Self { week: 1, day: 1 }
    }
}

impl Position {
    pub fn validate(&self, curriculum: &CurriculumMap) -> Result<()> {
        if !curriculum.contains_week(self.week) {
            return Err(Error::validation(format!(
                "week {} is outside the curriculum (1-{})",
                self.week,
                curriculum.week_count()
            )));
        }
        if !(1..=DAYS_PER_WEEK).contains(&self.day) {
            return Err(Error::validation(format!(
                "day {} is outside 1-{}",
                self.day, DAYS_PER_WEEK
            )));
        }
        Ok(())
    }
}

/// The learner, their position and an optional model choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub learner: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
}

impl SessionContext {
    pub fn new(learner: impl Into<String>) -> Self {
        Self {
            learner: learner.into(),
            position: Position::default(),
            model_override: None,
        }
    }

    /// Model explicitly chosen in this session, if any
    pub fn model(&self) -> Option<&str> {
        self.model_override
            .as_deref()
            .filter(|m| !m.trim().is_empty())
    }

    /// Apply a partial update, validating the new position first
    pub fn apply(&mut self, update: SessionUpdate, curriculum: &CurriculumMap) -> Result<()> {
        let position = Position {
            week: update.week.unwrap_or(self.position.week),
            day: update.day.unwrap_or(self.position.day),
        };
        position.validate(curriculum)?;
        self.position = position;

        if let Some(model) = update.model_override {
            let model = model.trim();
            self.model_override = (!model.is_empty()).then(|| model.to_string());
        }
        Ok(())
    }
}

/// Body of a session update; absent fields are left unchanged, an empty
/// `model_override` clears it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionUpdate {
    pub week: Option<u32>,
    pub day: Option<u32>,
    pub model_override: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_update() {
        let curriculum = CurriculumMap::builtin();
        let mut session = SessionContext::new("ada");

        session
            .apply(
                SessionUpdate {
                    week: Some(3),
                    model_override: Some(" codellama:7b ".to_string()),
                    ..Default::default()
                },
                &curriculum,
            )
            .unwrap();
        assert_eq!(session.position, Position { week: 3, day: 1 });
        assert_eq!(session.model(), Some("codellama:7b"));

        session
            .apply(
                SessionUpdate {
                    model_override: Some(String::new()),
                    ..Default::default()
                },
                &curriculum,
            )
            .unwrap();
        assert_eq!(session.model(), None);
    }

    #[test]
    fn test_invalid_position_leaves_session_unchanged() {
        let curriculum = CurriculumMap::builtin();
        let mut session = SessionContext::new("ada");
        let update = SessionUpdate {
            week: Some(2),
            day: Some(9),
            ..Default::default()
        };

        assert!(session.apply(update, &curriculum).is_err());
        assert_eq!(session.position, Position::default());
    }
}
