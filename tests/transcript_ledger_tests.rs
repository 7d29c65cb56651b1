// Unit tests for the transcript log's append-or-merge rule, the
// hypothesis buffer, and the answer ledger.

use huntboard_interview::session::{AnswerLedger, HypothesisBuffer};
use huntboard_interview::{Epoch, Speaker, TranscriptLog};

#[test]
fn test_prompt_entries_always_append() {
    let mut log = TranscriptLog::new();
    log.append_prompt("Tell me about yourself.", 0);
    log.append_prompt("Why this role?", 95);

    assert_eq!(log.len(), 2);
    assert_eq!(log.segments()[0].speaker, Speaker::Interviewer);
    assert_eq!(log.segments()[1].offset_seconds, 95);
    assert_eq!(log.segments()[1].index, 1);
}

#[test]
fn test_candidate_merges_within_epoch_keeping_offset() {
    let mut log = TranscriptLog::new();
    log.append_prompt("Tell me about yourself.", 0);
    log.merge_candidate("I have", 3, 0.4, Epoch(1));
    log.merge_candidate("I have five", 4, 0.5, Epoch(1));
    log.merge_candidate("I have five years", 6, 0.9, Epoch(1));

    assert_eq!(log.len(), 2);
    let last = log.segments().last().unwrap();
    assert_eq!(last.speaker, Speaker::Candidate);
    assert_eq!(last.text, "I have five years");
    // The merged entry keeps the offset of its first write
    assert_eq!(last.offset_seconds, 3);
    assert_eq!(last.confidence, Some(0.9));
}

#[test]
fn test_candidate_from_new_epoch_appends() {
    let mut log = TranscriptLog::new();
    log.append_prompt("Question?", 0);
    log.merge_candidate("take one", 2, 0.9, Epoch(1));
    log.merge_candidate("take two", 9, 0.9, Epoch(2));

    assert_eq!(log.len(), 3);
    assert_eq!(log.segments()[1].text, "take one");
    assert_eq!(log.segments()[2].text, "take two");
    assert_eq!(log.segments()[2].offset_seconds, 9);
}

#[test]
fn test_prompt_between_candidates_blocks_merging() {
    let mut log = TranscriptLog::new();
    log.append_prompt("Question 1?", 0);
    log.merge_candidate("answer one", 5, 0.9, Epoch(1));
    log.append_prompt("Question 2?", 30);
    // Same epoch number, but the candidate entry is no longer last
    log.merge_candidate("answer two", 35, 0.9, Epoch(1));

    assert_eq!(log.len(), 4);
    assert_eq!(log.segments()[1].text, "answer one");
    assert_eq!(log.segments()[3].text, "answer two");
}

#[test]
fn test_hypothesis_buffer_joins_committed_and_interim() {
    let mut buffer = HypothesisBuffer::default();
    assert!(buffer.is_empty());
    assert_eq!(buffer.text(), "");

    buffer.set_interim("I have");
    assert_eq!(buffer.text(), "I have");

    buffer.set_interim("I have five");
    assert_eq!(buffer.text(), "I have five");

    buffer.commit("I have five years");
    assert_eq!(buffer.text(), "I have five years");

    buffer.set_interim("of experience");
    assert_eq!(buffer.text(), "I have five years of experience");

    buffer.clear();
    assert!(buffer.is_empty());
}

#[test]
fn test_hypothesis_buffer_ignores_blank_finals() {
    let mut buffer = HypothesisBuffer::default();
    buffer.set_interim("something");
    buffer.commit("   ");
    assert_eq!(buffer.text(), "");

    buffer.commit("real text");
    assert_eq!(buffer.text(), "real text");
}

#[test]
fn test_ledger_always_has_one_slot_per_question() {
    let ledger = AnswerLedger::new(4);
    assert_eq!(ledger.len(), 4);
    assert!(ledger.answers().iter().all(|a| a.is_empty()));
}

#[test]
fn test_ledger_write_overwrites_single_slot() {
    let mut ledger = AnswerLedger::new(3);
    ledger.write(1, "first version".to_string());
    ledger.write(1, "second version".to_string());

    assert_eq!(ledger.answer(0), "");
    assert_eq!(ledger.answer(1), "second version");
    assert_eq!(ledger.answer(2), "");
}

#[test]
fn test_ledger_out_of_range_write_is_ignored() {
    let mut ledger = AnswerLedger::new(2);
    ledger.write(5, "nowhere".to_string());
    assert!(ledger.answers().iter().all(|a| a.is_empty()));
}
