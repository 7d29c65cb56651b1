// Unit tests for completion payload assembly: the rounding law, the
// padding law, and the wire shape of the update call.

use huntboard_interview::session::{build_payload, duration_minutes, AnswerLedger};
use huntboard_interview::FinalizePayload;

#[test]
fn test_duration_rounds_up_started_minutes() {
    assert_eq!(duration_minutes(0), 0);
    assert_eq!(duration_minutes(1), 1);
    assert_eq!(duration_minutes(59), 1);
    assert_eq!(duration_minutes(60), 1);
    assert_eq!(duration_minutes(61), 2);
    assert_eq!(duration_minutes(120), 2);
    assert_eq!(duration_minutes(121), 3);
}

#[test]
fn test_answers_padded_to_question_count() {
    let mut ledger = AnswerLedger::new(3);
    ledger.write(0, "only the first was recorded".to_string());

    let payload = build_payload("", 0, &[11, 22, 33], &ledger);

    assert_eq!(payload.interview_questions.len(), 3);
    assert_eq!(
        payload.interview_questions[0].answer,
        "only the first was recorded"
    );
    assert_eq!(payload.interview_questions[1].answer, "");
    assert_eq!(payload.interview_questions[2].answer, "");
    // Question ids stay in definition order
    let ids: Vec<i64> = payload.interview_questions.iter().map(|q| q.id).collect();
    assert_eq!(ids, vec![11, 22, 33]);
}

#[test]
fn test_payload_wire_shape_is_camel_case() {
    let mut ledger = AnswerLedger::new(1);
    ledger.write(0, "an answer".to_string());

    let payload = build_payload("some notes", 61, &[5], &ledger);
    let json = serde_json::to_string(&payload).unwrap();

    assert!(json.contains("\"interviewQuestions\""));
    assert!(json.contains("\"duration\":2"));
    assert!(json.contains("\"notes\":\"some notes\""));

    let parsed: FinalizePayload = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, payload);
}

#[test]
fn test_identical_payload_on_rebuild() {
    // A failed submission retries with the same inputs; the payload must
    // come out identical.
    let mut ledger = AnswerLedger::new(2);
    ledger.write(0, "stable".to_string());

    let first = build_payload("n", 75, &[1, 2], &ledger);
    let second = build_payload("n", 75, &[1, 2], &ledger);
    assert_eq!(first, second);
}
