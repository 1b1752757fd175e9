use super::*;
use crate::domain::QuestionField;

#[test]
fn submission_uses_backend_field_names() {
    let draft = QuizDraft::new()
        .with_title("Capitals")
        .with_question_field(0, QuestionField::Prompt, "Capital of France?")
        .and_then(|draft| draft.with_option(0, 0, "Paris"))
        .and_then(|draft| draft.with_question_field(0, QuestionField::Answer, "Paris"))
        .expect("edits");

    let value = serde_json::to_value(QuizSubmission::from(&draft)).expect("json");
    assert_eq!(
        value,
        serde_json::json!({
            "title": "Capitals",
            "questions": [{
                "question": "Capital of France?",
                "options": ["Paris", "", "", ""],
                "answer": "Paris"
            }]
        })
    );
}

#[test]
fn submission_rejects_wrong_option_count() {
    let raw = serde_json::json!({
        "title": "t",
        "questions": [{ "question": "q", "options": ["a", "b", "c"], "answer": "a" }]
    });
    assert!(serde_json::from_value::<QuizSubmission>(raw).is_err());
}

#[test]
fn user_profile_accepts_legacy_identity_field() {
    let profile: UserProfile =
        serde_json::from_str(r#"{"logged_in_as":"alice"}"#).expect("legacy body");
    assert_eq!(profile.username, "alice");

    let profile: UserProfile =
        serde_json::from_str(r#"{"username":"bob","email":"b@example.com"}"#).expect("body");
    assert_eq!(profile.username, "bob");
}

#[test]
fn user_profile_requires_a_username() {
    assert!(serde_json::from_str::<UserProfile>(r#"{"email":"x"}"#).is_err());
}

#[test]
fn open_attempt_serializes_null_completion() {
    let started_at = chrono::DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
        .expect("timestamp")
        .with_timezone(&Utc);
    let attempt = AttemptRecord {
        id: AttemptId(3),
        quiz_id: QuizId(7),
        user_id: UserId(1),
        started_at,
        completed_at: None,
        answers: vec![AnswerRecord {
            id: AnswerId(9),
            attempt_id: AttemptId(3),
            question_index: 0,
            answer_text: "Paris".to_string(),
        }],
    };

    let value = serde_json::to_value(&attempt).expect("json");
    assert_eq!(value["completed_at"], serde_json::Value::Null);
    assert_eq!(value["answers"][0]["question_index"], 0);
    assert_eq!(value["quiz_id"], 7);
}

#[test]
fn attempt_without_answers_field_decodes_empty() {
    let raw = serde_json::json!({
        "id": 1,
        "quiz_id": 2,
        "user_id": 3,
        "started_at": "2024-05-01T10:00:00Z",
        "completed_at": null
    });
    let attempt: AttemptRecord = serde_json::from_value(raw).expect("attempt");
    assert!(attempt.answers.is_empty());
    assert_eq!(attempt.completed_at, None);
}
