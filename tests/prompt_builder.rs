use mentor::curriculum::CurriculumMap;
use mentor::prompt::{build, Request, RequestDetails, RequestKind};
use mentor::Error;
use pretty_assertions::assert_eq;

fn request(kind: RequestKind, week: u32, day: u32) -> Request {
    let request = Request::new(kind, week, day);
    if kind.requires_payload() {
        request.with_payload("df = spark.read.parquet('s3://bucket/events')")
    } else {
        request
    }
}

#[test]
fn test_every_prompt_mentions_the_week_technologies() {
    let curriculum = CurriculumMap::builtin();

    for kind in RequestKind::ALL {
        for week in curriculum.weeks() {
            for day in 1..=7 {
                let prompt = build(&request(kind, week.week_number, day), &curriculum).unwrap();
                assert!(!prompt.is_empty());
                for tech in &week.technologies {
                    assert!(
                        prompt.contains(tech.as_str()),
                        "{} prompt for week {} day {} is missing {}",
                        kind,
                        week.week_number,
                        day,
                        tech
                    );
                }
            }
        }
    }
}

#[test]
fn test_build_is_deterministic() {
    let curriculum = CurriculumMap::builtin();
    let mut details = RequestDetails::default();
    details.self_assessment.insert("Spark".to_string(), 7);
    details.self_assessment.insert("Airflow".to_string(), 4);
    details.self_assessment.insert("Kafka".to_string(), 2);

    for kind in RequestKind::ALL {
        let req = request(kind, 4, 5).with_details(details.clone());
        assert_eq!(build(&req, &curriculum).unwrap(), build(&req, &curriculum).unwrap());
    }
}

#[test]
fn test_concept_explanation_uses_day_topic() {
    let curriculum = CurriculumMap::builtin();
    let prompt = build(
        &Request::new(RequestKind::ConceptExplanation, 2, 3),
        &curriculum,
    )
    .unwrap();
    assert!(prompt.contains("Apache Airflow"));
}

#[test]
fn test_payload_is_embedded_verbatim() {
    let curriculum = CurriculumMap::builtin();
    let code = "  SELECT *\n  FROM orders  -- keep {braces} & <tags>\n";
    let prompt = build(
        &Request::new(RequestKind::CodeReview, 1, 1).with_payload(code),
        &curriculum,
    )
    .unwrap();
    assert!(prompt.contains(code));
}

#[test]
fn test_code_review_without_payload_is_rejected() {
    let curriculum = CurriculumMap::builtin();
    for payload in [None, Some(""), Some(" \n\t")] {
        let mut req = Request::new(RequestKind::CodeReview, 1, 1);
        req.payload = payload.map(str::to_string);
        assert!(matches!(build(&req, &curriculum), Err(Error::Validation(_))));
    }
}

#[test]
fn test_position_out_of_range_is_rejected() {
    let curriculum = CurriculumMap::builtin();
    for (week, day) in [(0, 1), (7, 1), (1, 0), (1, 8)] {
        let req = Request::new(RequestKind::PracticeScenario, week, day);
        assert!(matches!(build(&req, &curriculum), Err(Error::Validation(_))));
    }
}

#[test]
fn test_request_json_shape() {
    let req: Request = serde_json::from_str(
        r#"{
            "kind": "skills_assessment",
            "week": 3,
            "day": 2,
            "details": { "self_assessment": { "Kafka": 6 } }
        }"#,
    )
    .unwrap();
    assert_eq!(req.kind, RequestKind::SkillsAssessment);
    assert_eq!(req.details.self_assessment["Kafka"], 6);

    let bad: Result<Request, _> =
        serde_json::from_str(r#"{"kind": "debugging", "week": 1, "day": 1}"#);
    assert!(bad.is_err());
}
