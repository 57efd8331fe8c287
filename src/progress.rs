//! Append-only progress log, one JSON Lines file per learner.
//!
//! Records are never rewritten. A later record for the same
//! `(week, day, topic)` supersedes an earlier one only in [`ProgressStore::current`].

use crate::curriculum::{CurriculumMap, DAYS_PER_WEEK};
use crate::error::{Error, Result};
use crate::id::{self, IdPrefix};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub const MIN_CONFIDENCE: u8 = 1;
pub const MAX_CONFIDENCE: u8 = 5;

/// Completion at or above which a topic counts as done
pub const COMPLETED_THRESHOLD: u8 = 80;

/// One logged study session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: String,
    pub week: u32,
    pub day: u32,
    pub topic: String,
    pub minutes_spent: u32,
    pub confidence: u8,
    #[serde(default)]
    pub completion_percent: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressRecord {
    pub fn key(&self) -> (u32, u32, &str) {
        (self.week, self.day, self.topic.as_str())
    }

    pub fn is_completed(&self) -> bool {
        self.completion_percent >= COMPLETED_THRESHOLD
    }

    /// Check ranges against a curriculum of `week_count` weeks
    pub fn validate(&self, week_count: u32) -> Result<()> {
        if !(1..=week_count).contains(&self.week) {
            return Err(Error::validation(format!(
                "week {} is outside the curriculum (1-{})",
                self.week, week_count
            )));
        }
        if !(1..=DAYS_PER_WEEK).contains(&self.day) {
            return Err(Error::validation(format!(
                "day {} is outside 1-{}",
                self.day, DAYS_PER_WEEK
            )));
        }
        if !(MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&self.confidence) {
            return Err(Error::validation(format!(
                "confidence {} is outside {}-{}",
                self.confidence, MIN_CONFIDENCE, MAX_CONFIDENCE
            )));
        }
        if self.completion_percent > 100 {
            return Err(Error::validation(format!(
                "completion {}% is above 100%",
                self.completion_percent
            )));
        }
        if self.topic.trim().is_empty() {
            return Err(Error::validation("topic must not be empty"));
        }
        Ok(())
    }
}

/// A session as submitted by the learner, before an id and timestamp are assigned
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub week: u32,
    pub day: u32,
    /// Defaults to the curriculum topic of the day
    #[serde(default)]
    pub topic: Option<String>,
    pub minutes_spent: u32,
    pub confidence: u8,
    #[serde(default)]
    pub completion_percent: u8,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ProgressEntry {
    /// Stamp the entry, filling a blank topic from the curriculum
    pub fn into_record(self, curriculum: &CurriculumMap) -> Result<ProgressRecord> {
        let topic = match self.topic.filter(|t| !t.trim().is_empty()) {
            Some(topic) => topic,
            None => curriculum
                .day_topic(self.week, self.day)
                .unwrap_or_default()
                .to_string(),
        };

        let record = ProgressRecord {
            id: id::ascending(IdPrefix::Progress),
            week: self.week,
            day: self.day,
            topic,
            minutes_spent: self.minutes_spent,
            confidence: self.confidence,
            completion_percent: self.completion_percent,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            timestamp: Utc::now(),
        };
        record.validate(curriculum.week_count())?;
        Ok(record)
    }
}

/// Restrict listings to a week, optionally to one day of it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekFilter {
    pub week: u32,
    #[serde(default)]
    pub day: Option<u32>,
}

impl WeekFilter {
    pub fn week(week: u32) -> Self {
        Self { week, day: None }
    }

    pub fn day(week: u32, day: u32) -> Self {
        Self {
            week,
            day: Some(day),
        }
    }

    pub fn matches(&self, record: &ProgressRecord) -> bool {
        record.week == self.week && self.day.map_or(true, |d| record.day == d)
    }
}

/// File-backed progress log for one learner
pub struct ProgressStore {
    path: PathBuf,
    week_count: u32,
    write_lock: Mutex<()>,
}

impl ProgressStore {
    /// Store at `<data_dir>/progress/<learner>.jsonl`; the file is created on first append
    pub fn open(data_dir: &Path, learner: &str) -> Result<Self> {
        let name = file_stem(learner)?;
        Ok(Self {
            path: data_dir.join("progress").join(format!("{}.jsonl", name)),
            week_count: CurriculumMap::builtin().week_count(),
            write_lock: Mutex::new(()),
        })
    }

    /// Validate weeks against `curriculum` instead of the built-in table
    pub fn with_curriculum(mut self, curriculum: &CurriculumMap) -> Self {
        self.week_count = curriculum.week_count();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate and append one record
    pub async fn append(&self, record: &ProgressRecord) -> Result<()> {
        record.validate(self.week_count)?;

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(
            "Logged {} for week {} day {} ({} min)",
            record.id,
            record.week,
            record.day,
            record.minutes_spent
        );
        Ok(())
    }

    /// All records in file order, optionally filtered
    pub async fn list(&self, filter: Option<WeekFilter>) -> Result<Vec<ProgressRecord>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ProgressRecord>(line) {
                Ok(record) => {
                    if filter.map_or(true, |f| f.matches(&record)) {
                        records.push(record);
                    }
                }
                Err(e) => tracing::warn!(
                    "Skipping unreadable line {} in {:?}: {}",
                    idx + 1,
                    self.path,
                    e
                ),
            }
        }
        Ok(records)
    }

    /// Latest record per `(week, day, topic)`, in file order
    pub async fn current(&self, filter: Option<WeekFilter>) -> Result<Vec<ProgressRecord>> {
        Ok(supersede(self.list(filter).await?))
    }

    /// Minutes recorded for `week` in the current view
    pub async fn total_minutes(&self, week: u32) -> Result<u64> {
        Ok(self
            .current(Some(WeekFilter::week(week)))
            .await?
            .iter()
            .map(|r| u64::from(r.minutes_spent))
            .sum())
    }
}

/// Keep only the last record for each `(week, day, topic)`
pub fn supersede(records: Vec<ProgressRecord>) -> Vec<ProgressRecord> {
    let mut seen = HashSet::new();
    let mut latest: Vec<ProgressRecord> = records
        .into_iter()
        .rev()
        .filter(|r| seen.insert((r.week, r.day, r.topic.clone())))
        .collect();
    latest.reverse();
    latest
}

fn file_stem(learner: &str) -> Result<String> {
    let stem: String = learner
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.trim_matches('_').is_empty() {
        return Err(Error::validation(format!(
            "learner name '{}' cannot be used as a file name",
            learner
        )));
    }
    Ok(stem)
}
