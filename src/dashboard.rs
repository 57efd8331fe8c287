//! Aggregates for the progress dashboard.
//!
//! Everything is computed over the superseding view of the log, so a topic
//! logged twice counts once with its latest values.

use crate::curriculum::{CurriculumMap, CurriculumWeek, DAYS_PER_WEEK};
use crate::progress::{supersede, ProgressRecord};
use serde::{Deserialize, Serialize};

/// Headline numbers shown above the charts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuickStats {
    pub total_hours: f64,
    pub average_confidence: f64,
    pub completed_topics: usize,
    pub sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayStatus {
    pub day: u32,
    pub topic: String,
    pub minutes: u64,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSummary {
    pub week: u32,
    pub title: String,
    pub technologies: Vec<String>,
    pub entries: usize,
    pub total_minutes: u64,
    pub average_confidence: f64,
    pub average_completion: f64,
    pub days: Vec<DayStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub quick: QuickStats,
    pub weeks: Vec<WeekSummary>,
}

impl Dashboard {
    pub fn build(curriculum: &CurriculumMap, records: Vec<ProgressRecord>) -> Self {
        let current = supersede(records);

        let total_minutes: u64 = current.iter().map(|r| u64::from(r.minutes_spent)).sum();
        let quick = QuickStats {
            total_hours: round1(total_minutes as f64 / 60.0),
            average_confidence: round1(mean(current.iter().map(|r| f64::from(r.confidence)))),
            completed_topics: current.iter().filter(|r| r.is_completed()).count(),
            sessions: current.len(),
        };

        let weeks = curriculum
            .weeks()
            .iter()
            .map(|week| summarize_week(week, &current))
            .collect();

        Self { quick, weeks }
    }
}

fn summarize_week(week: &CurriculumWeek, current: &[ProgressRecord]) -> WeekSummary {
    let records: Vec<&ProgressRecord> = current
        .iter()
        .filter(|r| r.week == week.week_number)
        .collect();

    let days = (1..=DAYS_PER_WEEK)
        .map(|day| {
            let logged = records.iter().filter(|r| r.day == day);
            DayStatus {
                day,
                topic: week.day_topic(day).unwrap_or_default().to_string(),
                minutes: logged.clone().map(|r| u64::from(r.minutes_spent)).sum(),
                completed: logged.clone().any(|r| r.is_completed()),
            }
        })
        .collect();

    WeekSummary {
        week: week.week_number,
        title: week.title.clone(),
        technologies: week.technologies.clone(),
        entries: records.len(),
        total_minutes: records.iter().map(|r| u64::from(r.minutes_spent)).sum(),
        average_confidence: round1(mean(records.iter().map(|r| f64::from(r.confidence)))),
        average_completion: round1(mean(
            records.iter().map(|r| f64::from(r.completion_percent)),
        )),
        days,
    }
}

/// Mean, or 0 for no values
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
