//! One formatting function per request kind.
//!
//! Every template starts from the same curriculum context block so the week's
//! technologies always reach the model.

use super::RequestDetails;
use crate::curriculum::CurriculumWeek;

const DEFAULT_LEARNING_OBJECTIVE: &str = "Not specified";
const DEFAULT_SKILL_LEVEL: &str = "Intermediate";
const DEFAULT_AVAILABLE_TIME: &str = "1 hour";
const DEFAULT_CURRENT_LEVEL: &str = "Some familiarity";
const DEFAULT_LEARNING_STYLE: &str = "Real-world examples";
const DEFAULT_FOCUS_AREA: &str = "Technical Deep Dive";
const DEFAULT_TIME_SPENT: &str = "Not recorded";

/// Where in the curriculum the request sits
pub(crate) struct Position<'a> {
    pub week: &'a CurriculumWeek,
    pub day: u32,
    pub day_topic: &'a str,
}

fn or_default<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

fn context_block(pos: &Position<'_>) -> String {
    format!(
        "CURRICULUM CONTEXT:\n\
         - Week {week}: {title}\n\
         - Day {day}: {topic}\n\
         - Week Focus: {focus}\n\
         - Week Technologies: {techs}\n\
         - Key Concepts: {concepts}\n",
        week = pos.week.week_number,
        title = pos.week.title,
        day = pos.day,
        topic = pos.day_topic,
        focus = pos.week.focus_description,
        techs = pos.week.technologies.join(", "),
        concepts = pos.week.key_concepts.join(", "),
    )
}

pub(crate) fn code_review(pos: &Position<'_>, details: &RequestDetails, code: &str) -> String {
    let technology = details
        .technology
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| pos.week.technologies[0].as_str());
    let fence = technology.to_lowercase().replace(' ', "-");
    let objective = or_default(&details.learning_objective, DEFAULT_LEARNING_OBJECTIVE);
    let week = pos.week.week_number;

    format!(
        "You are a senior data engineering mentor. Review this {technology} code written by a \
         student in Week {week} of a staff-level curriculum.\n\
         \n\
         {context}\
         - Learning Objective: {objective}\n\
         \n\
         CODE TO REVIEW:\n\
         ```{fence}\n\
         {code}\n\
         ```\n\
         \n\
         Structure your feedback as:\n\
         \n\
         1. **Code Quality**: syntax, structure, best practices, staff-level expectations\n\
         2. **Curriculum Alignment**: how well it demonstrates Week {week} concepts and connects \
         to the other technologies on the learning path\n\
         3. **Performance & Optimization**: {technology} specifics and scalability concerns\n\
         4. **Learning Enhancement**: concepts this code exercises and areas to explore further\n\
         5. **Next-Level Challenges**: ways to extend it with other Week {week} technologies\n\
         6. **Interview Readiness**: what it shows about staff-level skill and the questions an \
         interviewer might ask about it\n\
         \n\
         Be detailed and educational, and tie the feedback back to the learner's journey.",
        context = context_block(pos),
    )
}

pub(crate) fn concept_explanation(
    pos: &Position<'_>,
    details: &RequestDetails,
    concept: Option<&str>,
) -> String {
    let concept = concept.unwrap_or(pos.day_topic);
    let level = or_default(&details.current_level, DEFAULT_CURRENT_LEVEL);
    let style = or_default(&details.learning_style, DEFAULT_LEARNING_STYLE);
    let week = pos.week.week_number;
    let techs = pos.week.technologies.join(", ");

    format!(
        "Explain {concept} to a learner in Week {week} of a data engineering curriculum. \
         Their current level with this concept: {level}. Preferred learning style: {style}.\n\
         \n\
         {context}\
         \n\
         Cover:\n\
         \n\
         1. **Core Concept**: a clear definition pitched at their level and why it matters this \
         week\n\
         2. **Curriculum Integration**: how {concept} connects to {techs}, to earlier material \
         and to what comes next\n\
         3. **Practical Application**: real-world examples using {techs}\n\
         4. **Learning Style Adaptation**: present it in a way that suits \"{style}\"\n\
         5. **Common Misconceptions**: typical misunderstandings at this level and their \
         corrections\n\
         6. **Progression Path**: what to master first and how it relates to staff-level work\n\
         7. **Practice Opportunities**: exercises using this week's technologies\n\
         \n\
         Keep it accessible without losing depth.",
        context = context_block(pos),
    )
}

pub(crate) fn practice_scenario(pos: &Position<'_>, details: &RequestDetails) -> String {
    let skill = or_default(&details.skill_level, DEFAULT_SKILL_LEVEL);
    let time = or_default(&details.available_time, DEFAULT_AVAILABLE_TIME);
    let week = pos.week.week_number;
    let day = pos.day;

    format!(
        "Create a hands-on practice scenario for a learner on Day {day} of Week {week} of a \
         data engineering curriculum.\n\
         \n\
         {context}\
         - Learner Level: {skill}\n\
         - Available Time: {time}\n\
         \n\
         The scenario must include:\n\
         \n\
         1. **Business Context**: a realistic company problem that needs today's technologies, \
         with clear requirements and constraints\n\
         2. **Technical Challenge**: concrete use of the Day {day} material, building on \
         earlier weeks, sized for a {skill} learner\n\
         3. **Step-by-Step Implementation**: tasks that fit in {time}\n\
         4. **Learning Objectives**: skills reinforced and links to upcoming topics\n\
         5. **Validation & Testing**: how to verify the result, with staff-level benchmarks\n\
         6. **Extension Opportunities**: ways to go deeper with other curriculum technologies\n\
         7. **Real-World Application**: how this mirrors staff-level responsibilities and what \
         to mention about it in an interview\n\
         \n\
         Make it practical and aligned with where the learner is in the program.",
        context = context_block(pos),
    )
}

pub(crate) fn skills_assessment(pos: &Position<'_>, details: &RequestDetails) -> String {
    let week = pos.week.week_number;
    let techs = pos.week.technologies.join(", ");
    let scores = if details.self_assessment.is_empty() {
        "- Not provided\n".to_string()
    } else {
        details
            .self_assessment
            .iter()
            .map(|(skill, score)| format!("- {}: {}/10\n", skill, score))
            .collect()
    };

    format!(
        "Assess a learner's readiness for Week {week} of a data engineering curriculum based on \
         their self-assessment.\n\
         \n\
         {context}\
         \n\
         SELF-ASSESSMENT SCORES (1-10 scale):\n\
         {scores}\
         \n\
         Provide:\n\
         \n\
         1. **Readiness Analysis**: are they ready for Week {week}, and which gaps need attention\n\
         2. **Technology Alignment**: preparedness for {techs} and development priorities\n\
         3. **Learning Strategy**: focus areas and time allocation for the week\n\
         4. **Risk Assessment**: likely difficulties and how to mitigate them\n\
         5. **Acceleration Opportunities**: where they can move faster or go further\n\
         6. **Support Recommendations**: resources and community engagement\n\
         7. **Success Metrics**: how to measure progress and target levels by week's end\n\
         \n\
         Be honest about readiness while keeping the advice actionable.",
        context = context_block(pos),
    )
}

pub(crate) fn interview_prep(
    pos: &Position<'_>,
    details: &RequestDetails,
    covered_technologies: &[&str],
    covered_concepts: &[&str],
) -> String {
    let week = pos.week.week_number;
    let focus = or_default(&details.focus_area, DEFAULT_FOCUS_AREA);

    format!(
        "Generate staff-level data engineering interview questions for a candidate who has \
         completed {week} week(s) of the curriculum.\n\
         \n\
         {context}\
         \n\
         COMPLETED LEARNING:\n\
         - Technologies Covered: {techs}\n\
         - Concepts Covered: {concepts}\n\
         - Focus Area: {focus}\n\
         \n\
         Group the questions as:\n\
         \n\
         1. **Technical Deep Dive** (3-4 questions) on the technologies covered\n\
         2. **System Design** (2-3 scenarios) built from those technologies\n\
         3. **Trade-offs & Decision Making** (2-3 questions) on choosing between them\n\
         4. **Problem Solving** (2-3 scenarios) on debugging and optimization\n\
         5. **Leadership & Communication** (2-3 questions) on mentoring and explaining designs\n\
         \n\
         For each question give the question, the key points of a strong answer, follow-up \
         questions, and how it relates to the curriculum.",
        context = context_block(pos),
        techs = covered_technologies.join(", "),
        concepts = covered_concepts.join(", "),
    )
}

pub(crate) fn learning_analysis(
    pos: &Position<'_>,
    details: &RequestDetails,
    understanding: Option<&str>,
) -> String {
    let topic = or_default(&details.topic, pos.day_topic);
    let time_spent = or_default(&details.time_spent, DEFAULT_TIME_SPENT);
    let understanding = understanding.unwrap_or("Not described");
    let week = pos.week.week_number;
    let day = pos.day;

    format!(
        "You are an expert data engineering mentor working with a learner who follows a \
         structured six-week staff-level curriculum.\n\
         \n\
         {context}\
         \n\
         LEARNER STATUS:\n\
         - Current Topic: {topic}\n\
         - Time Spent: {time_spent}\n\
         - Current Understanding:\n\
         {understanding}\n\
         \n\
         Provide a learning analysis covering:\n\
         \n\
         1. **Progress Assessment**: how they are doing for Day {day} of Week {week}\n\
         2. **Curriculum Alignment**: how their understanding compares with the expected \
         outcomes\n\
         3. **Technology Mastery**: specific guidance on {topic}\n\
         4. **Next Steps**: concrete actions for tomorrow and the rest of the week\n\
         5. **Integration Opportunities**: links between this topic and the other curriculum \
         technologies\n\
         6. **Practice Recommendations**: hands-on exercises\n\
         7. **Potential Challenges**: common pitfalls at this stage\n\
         8. **Success Metrics**: how to tell they are ready for the next topic\n\
         \n\
         Be specific and encouraging.",
        context = context_block(pos),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::CurriculumMap;

    fn position(map: &CurriculumMap, week: u32, day: u32) -> Position<'_> {
        Position {
            week: map.get_week(week).unwrap(),
            day,
            day_topic: map.day_topic(week, day).unwrap(),
        }
    }

    #[test]
    fn test_context_block_lists_week() {
        let map = CurriculumMap::builtin();
        let block = context_block(&position(&map, 1, 2));
        assert!(block.contains("- Week 1: Foundation & Modern Lakehouse"));
        assert!(block.contains("- Day 2: Advanced Iceberg Features"));
        assert!(block.contains("Apache Iceberg, Delta Lake, AWS Glue, Spark"));
    }

    #[test]
    fn test_code_review_fences_code_with_technology() {
        let map = CurriculumMap::builtin();
        let details = RequestDetails {
            technology: Some("Airflow DAG".to_string()),
            ..Default::default()
        };
        let prompt = code_review(&position(&map, 2, 3), &details, "dag = DAG('x')");
        assert!(prompt.contains("```airflow-dag\ndag = DAG('x')\n```"));
        assert!(prompt.contains("Learning Objective: Not specified"));
    }

    #[test]
    fn test_code_review_defaults_to_first_week_technology() {
        let map = CurriculumMap::builtin();
        let prompt = code_review(&position(&map, 4, 1), &RequestDetails::default(), "x");
        assert!(prompt.starts_with("You are a senior data engineering mentor. Review this Terraform code"));
    }

    #[test]
    fn test_concept_explanation_falls_back_to_day_topic() {
        let map = CurriculumMap::builtin();
        let prompt = concept_explanation(&position(&map, 3, 3), &RequestDetails::default(), None);
        assert!(prompt.starts_with("Explain Data Quality Frameworks to a learner in Week 3"));
    }

    #[test]
    fn test_skills_assessment_renders_scores_in_key_order() {
        let map = CurriculumMap::builtin();
        let mut details = RequestDetails::default();
        details.self_assessment.insert("dbt".to_string(), 4);
        details.self_assessment.insert("Apache Kafka".to_string(), 7);
        let prompt = skills_assessment(&position(&map, 2, 1), &details);
        assert!(prompt.contains("- Apache Kafka: 7/10\n- dbt: 4/10\n"));
    }

    #[test]
    fn test_blank_detail_uses_default() {
        let map = CurriculumMap::builtin();
        let details = RequestDetails {
            skill_level: Some("  ".to_string()),
            ..Default::default()
        };
        let prompt = practice_scenario(&position(&map, 1, 1), &details);
        assert!(prompt.contains("- Learner Level: Intermediate"));
        assert!(prompt.contains("- Available Time: 1 hour"));
    }
}
