use serde::{Deserialize, Serialize};

use super::ledger::AnswerLedger;

/// The completion payload submitted to the interview store.
///
/// Field names follow the backend contract: `duration` is whole minutes
/// and `interviewQuestions` always has one entry per question of the
/// original definition, in order, with unrecorded answers as `""`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizePayload {
    pub notes: String,
    pub duration: u32,
    pub interview_questions: Vec<QuestionResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub id: i64,
    pub answer: String,
}

/// Whole minutes, rounded up: any started minute counts.
pub fn duration_minutes(elapsed_seconds: u64) -> u32 {
    elapsed_seconds.div_ceil(60) as u32
}

/// Assemble the completion payload from the ledger and session metadata.
///
/// The ledger carries one slot per question from the moment the session
/// opens, so the answer array is fully padded regardless of how many
/// questions were actually recorded.
pub fn build_payload(
    notes: &str,
    elapsed_seconds: u64,
    question_ids: &[i64],
    ledger: &AnswerLedger,
) -> FinalizePayload {
    let interview_questions = question_ids
        .iter()
        .enumerate()
        .map(|(i, &id)| QuestionResult {
            id,
            answer: ledger.answer(i).to_string(),
        })
        .collect();

    FinalizePayload {
        notes: notes.to_string(),
        duration: duration_minutes(elapsed_seconds),
        interview_questions,
    }
}
