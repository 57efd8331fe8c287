//! Static six-week curriculum table.
//!
//! The map is built once at startup, either from the built-in table or from a
//! JSON file named in the configuration, and is read-only afterwards.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Days per curriculum week
pub const DAYS_PER_WEEK: u32 = 7;

/// One week of the syllabus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumWeek {
    pub week_number: u32,
    pub title: String,
    /// Daily topics, index 0 is day 1
    pub days: Vec<String>,
    pub technologies: Vec<String>,
    pub key_concepts: Vec<String>,
    pub focus_description: String,
}

impl CurriculumWeek {
    /// Topic for a 1-based day within this week
    pub fn day_topic(&self, day: u32) -> Option<&str> {
        if day == 0 {
            return None;
        }
        self.days.get(day as usize - 1).map(String::as_str)
    }
}

/// Read-only week lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurriculumMap {
    weeks: Vec<CurriculumWeek>,
}

impl CurriculumMap {
    /// The data-engineering curriculum the application ships with
    pub fn builtin() -> Self {
        Self {
            weeks: vec![
                week(
                    1,
                    "Foundation & Modern Lakehouse",
                    [
                        "Environment Setup & Apache Iceberg Foundations",
                        "Advanced Iceberg Features",
                        "Delta Lake Fundamentals",
                        "Delta Lake Advanced Features",
                        "AWS Glue Deep Dive",
                        "Integration Project - Lakehouse Platform",
                        "Week 1 Review & Assessment",
                    ],
                    &["Apache Iceberg", "Delta Lake", "AWS Glue", "Spark"],
                    &["ACID transactions", "Time travel", "Schema evolution", "Table formats"],
                    "Open table formats and the lakehouse: how Iceberg and Delta Lake bring \
                     transactional guarantees to object storage.",
                ),
                week(
                    2,
                    "Data Processing & Orchestration",
                    [
                        "Apache Spark Performance Tuning",
                        "Spark Structured Streaming",
                        "Apache Airflow Advanced Patterns",
                        "dbt Analytics Engineering",
                        "Kafka & Stream Processing",
                        "Integration Project - Real-time Analytics Pipeline",
                        "Week 2 Review & System Design Practice",
                    ],
                    &["Apache Spark", "Apache Airflow", "dbt", "Apache Kafka"],
                    &["Performance tuning", "Streaming", "Orchestration", "Analytics engineering"],
                    "Batch and streaming processing at scale, and orchestrating pipelines \
                     end to end.",
                ),
                week(
                    3,
                    "Data Storage & Quality",
                    [
                        "Database Performance & Optimization",
                        "Object Storage & Data Lake Optimization",
                        "Data Quality Frameworks",
                        "Data Governance & Compliance",
                        "Amazon EMR & Advanced Analytics",
                        "Amazon Athena Query Optimization",
                        "Week 3 Review & Data Architecture Design",
                    ],
                    &["PostgreSQL", "S3", "Amazon EMR", "Amazon Athena"],
                    &["Data quality", "Governance", "Query optimization", "Storage optimization"],
                    "Storage layout, query performance and keeping data trustworthy and \
                     compliant.",
                ),
                week(
                    4,
                    "DevOps & Infrastructure",
                    [
                        "Infrastructure as Code with Terraform",
                        "Docker & Kubernetes for Data Workloads",
                        "CI/CD for Data Applications",
                        "Monitoring & Observability",
                        "Cost Optimization & FinOps",
                        "Production Operations & SRE",
                        "Week 4 Review & Production Deployment",
                    ],
                    &["Terraform", "Docker", "Kubernetes", "CI/CD"],
                    &["Infrastructure as Code", "Containerization", "Monitoring", "Cost optimization"],
                    "Running data platforms in production: infrastructure, delivery, \
                     observability and cost.",
                ),
                week(
                    5,
                    "Leadership & Advanced Topics",
                    [
                        "Technical Leadership & Mentoring",
                        "System Design at Scale",
                        "Emerging Technologies Research",
                        "Business Impact & Strategy",
                        "Open Source Contribution",
                        "Industry Networking & Knowledge Sharing",
                        "Week 5 Review & Leadership Assessment",
                    ],
                    &["Leadership Skills", "System Design", "Emerging Tech"],
                    &[
                        "Technical leadership",
                        "Scalability",
                        "Business strategy",
                        "Community contribution",
                    ],
                    "Staff-level scope: designing for scale and leading through influence.",
                ),
                week(
                    6,
                    "Interview Preparation & Portfolio",
                    [
                        "Technical Interview Preparation",
                        "System Design Interview Mastery",
                        "Behavioral Interview Preparation",
                        "Portfolio Development & Documentation",
                        "Mock Interviews & Final Preparation",
                        "Company Research & Application Strategy",
                        "Program Completion & Final Assessment",
                    ],
                    &["Interview Skills", "Portfolio Development"],
                    &[
                        "Technical interviews",
                        "System design",
                        "Behavioral interviews",
                        "Portfolio",
                    ],
                    "Turning the program into interview performance and a public portfolio.",
                ),
            ],
        }
    }

    /// Build a map from explicit weeks, checking numbering and day counts
    pub fn from_weeks(weeks: Vec<CurriculumWeek>) -> Result<Self> {
        if weeks.is_empty() {
            return Err(Error::configuration("curriculum has no weeks"));
        }

        for (idx, w) in weeks.iter().enumerate() {
            let expected = idx as u32 + 1;
            if w.week_number != expected {
                return Err(Error::configuration(format!(
                    "curriculum week {} is out of order (expected week {})",
                    w.week_number, expected
                )));
            }
            if w.days.len() != DAYS_PER_WEEK as usize {
                return Err(Error::configuration(format!(
                    "curriculum week {} has {} days (expected {})",
                    w.week_number,
                    w.days.len(),
                    DAYS_PER_WEEK
                )));
            }
            if w.technologies.is_empty() {
                return Err(Error::configuration(format!(
                    "curriculum week {} lists no technologies",
                    w.week_number
                )));
            }
        }

        Ok(Self { weeks })
    }

    /// Load a JSON array of weeks from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let weeks: Vec<CurriculumWeek> = serde_json::from_str(&content)?;
        Self::from_weeks(weeks)
    }

    pub fn weeks(&self) -> &[CurriculumWeek] {
        &self.weeks
    }

    pub fn week_count(&self) -> u32 {
        self.weeks.len() as u32
    }

    pub fn contains_week(&self, n: u32) -> bool {
        n >= 1 && n <= self.week_count()
    }

    pub fn get_week(&self, n: u32) -> Result<&CurriculumWeek> {
        if !self.contains_week(n) {
            return Err(Error::not_found(format!(
                "week {} is outside the curriculum (1-{})",
                n,
                self.week_count()
            )));
        }
        Ok(&self.weeks[n as usize - 1])
    }

    pub fn day_topic(&self, week: u32, day: u32) -> Result<&str> {
        let w = self.get_week(week)?;
        w.day_topic(day).ok_or_else(|| {
            Error::not_found(format!(
                "day {} is outside week {} (1-{})",
                day, week, DAYS_PER_WEEK
            ))
        })
    }

    /// Technologies of weeks `1..=week`, first occurrence wins
    pub fn technologies_through(&self, week: u32) -> Vec<&str> {
        self.collect_through(week, |w| &w.technologies)
    }

    /// Key concepts of weeks `1..=week`, first occurrence wins
    pub fn concepts_through(&self, week: u32) -> Vec<&str> {
        self.collect_through(week, |w| &w.key_concepts)
    }

    fn collect_through<'a, F>(&'a self, week: u32, field: F) -> Vec<&'a str>
    where
        F: Fn(&'a CurriculumWeek) -> &'a Vec<String>,
    {
        let mut out: Vec<&str> = Vec::new();
        for w in self.weeks.iter().take(week as usize) {
            for item in field(w) {
                if !out.contains(&item.as_str()) {
                    out.push(item);
                }
            }
        }
        out
    }
}

impl Default for CurriculumMap {
    fn default() -> Self {
        Self::builtin()
    }
}

fn week(
    number: u32,
    title: &str,
    days: [&str; DAYS_PER_WEEK as usize],
    technologies: &[&str],
    key_concepts: &[&str],
    focus: &str,
) -> CurriculumWeek {
    CurriculumWeek {
        week_number: number,
        title: title.to_string(),
        days: days.iter().map(|d| d.to_string()).collect(),
        technologies: technologies.iter().map(|t| t.to_string()).collect(),
        key_concepts: key_concepts.iter().map(|c| c.to_string()).collect(),
        focus_description: focus.to_string(),
    }
}
