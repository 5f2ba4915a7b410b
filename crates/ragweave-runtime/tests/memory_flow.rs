// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session memory flows: ephemeral turn accumulation, persistent memory
//! feeding follow-up questions, cascaded deletion, and the per-session
//! language cache.

mod common;

use std::sync::Arc;

use common::{harness, harness_with};
use ragweave_runtime::{AskOptions, ChannelEventSink};

const LAUNCH_TEXT: &str = "Our project has been launched since 2023 in Portugal.";
const SEMMAPAS_TEXT: &str = "SemMapas has been launched since 2023 in Portugal.";

fn ask_options(session: &str, persistent: bool) -> AskOptions {
    AskOptions::builder()
        .prefix("Company")
        .index("semmapas")
        .session_id(session)
        .persistent_memory(persistent)
        .build()
}

#[tokio::test]
async fn ephemeral_memory_accumulates_turns_in_order() {
    let h = harness().await;
    h.ingest("Company", "semmapas", "launch", LAUNCH_TEXT).await;
    h.llm.push_response("It is a mapping project.");
    h.llm.push_response("It launched in 2023.");

    h.runtime
        .ask("Tell me about the project launch", ask_options("u1", false))
        .await
        .unwrap();
    h.runtime
        .ask("When was the project launched?", ask_options("u1", false))
        .await
        .unwrap();

    let turns = h.runtime.ephemeral_memory().get_memory("u1").unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].question, "Tell me about the project launch");
    assert_eq!(turns[1].question, "When was the project launched?");
    assert_eq!(turns[1].answer, "It launched in 2023.");
}

#[tokio::test]
async fn persistent_memory_carries_context_to_followups() {
    let h = harness().await;
    h.ingest("Company", "semmapas", "launch", SEMMAPAS_TEXT).await;

    // Turn 1: grounded answer, stored in memory.
    h.llm.push_response("SemMapas launched in Portugal in 2023.");
    let first = h
        .runtime
        .ask("Tell me about SemMapas", ask_options("u1", true))
        .await
        .unwrap();
    assert!(!first.failed_to_respond);

    // Turn 2: the question alone matches nothing, but the memory-extended
    // retrieval key still finds the launch document, and the previous turn
    // enters the prompt. The summarizer runs after the second turn.
    h.llm.push_response("In Portugal, in 2023.");
    h.llm.push_response("User asked about the SemMapas launch.");
    let second = h
        .runtime
        .ask("Where and when?", ask_options("u1", true))
        .await
        .unwrap();

    assert!(!second.failed_to_respond, "memory should keep the thread grounded");
    assert!(!second.rag_docs.is_empty());
    let system = second.prompt[0].text_content();
    assert!(
        system.contains("Tell me about SemMapas"),
        "previous turn should be in the prompt: {system}"
    );

    // Summary is stored once two turns exist.
    let readout = h
        .runtime
        .persistent_memory()
        .get_memory("u1", "launch")
        .await
        .unwrap();
    assert_eq!(readout.record.questions.len(), 2);
    assert_eq!(readout.record.summary, "User asked about the SemMapas launch.");
}

#[tokio::test]
async fn deleting_memory_drops_the_thread() {
    let h = harness().await;
    h.ingest("Company", "semmapas", "launch", SEMMAPAS_TEXT).await;

    h.llm.push_response("SemMapas launched in Portugal in 2023.");
    h.runtime
        .ask("Tell me about SemMapas", ask_options("u1", true))
        .await
        .unwrap();

    h.runtime.delete_memory("u1").await.unwrap();

    // Without the remembered question, the bare follow-up finds nothing.
    h.llm
        .push_response("@I can't find any answer regarding your question.");
    let result = h
        .runtime
        .ask("Where and when?", ask_options("u1", true))
        .await
        .unwrap();
    assert!(result.failed_to_respond);
    assert!(result.rag_docs.is_empty());

    // The store holds no trace of the session.
    assert!(!h.store.contains_key("rawMemory:Memory:u1"));
}

#[tokio::test]
async fn refused_answers_never_enter_memory() {
    let h = harness().await;
    h.llm
        .push_response("@I can't find any answer regarding your question.");

    h.runtime
        .ask("Anything about nothing?", ask_options("u1", false))
        .await
        .unwrap();

    assert!(h.runtime.ephemeral_memory().get_memory("u1").is_none());
}

#[tokio::test]
async fn language_detected_once_per_session() {
    let h = harness_with(|config| {
        config.language_detection_enabled = true;
    })
    .await;
    h.ingest("Company", "semmapas", "launch", LAUNCH_TEXT).await;

    // Detection, then the answer.
    h.llm.push_response("English");
    h.llm.push_response("Portugal.");
    h.runtime
        .ask("Where did the project launch?", ask_options("u1", false))
        .await
        .unwrap();

    // Second ask in the same session: no detection call.
    h.llm.push_response("In 2023.");
    h.runtime
        .ask("When was the project launched?", ask_options("u1", false))
        .await
        .unwrap();

    let requests = h.llm.requests();
    // detect + answer + answer = 3 provider calls in total.
    assert_eq!(requests.len(), 3);
    let detection_calls = requests
        .iter()
        .filter(|r| r.messages[0].text_content().contains("What language is"))
        .count();
    assert_eq!(detection_calls, 1);
}

#[tokio::test]
async fn language_channel_receives_detected_language() {
    let h = harness_with(|config| {
        config.language_detection_enabled = true;
    })
    .await;
    h.ingest("Company", "semmapas", "launch", LAUNCH_TEXT).await;

    h.llm.push_response("English");
    h.llm.push_response("Portugal.");
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    let options = AskOptions::builder()
        .prefix("Company")
        .index("semmapas")
        .session_id("u1")
        .event_sink(Arc::new(ChannelEventSink::new(sender)))
        .build();
    h.runtime
        .ask("Where did the project launch?", options)
        .await
        .unwrap();

    let delivered = tokio::time::timeout(std::time::Duration::from_secs(1), receiver.recv())
        .await
        .expect("language should be delivered");
    assert_eq!(delivered.as_deref(), Some("English"));
}

#[tokio::test]
async fn portuguese_detection_is_normalized() {
    let h = harness_with(|config| {
        config.language_detection_enabled = true;
    })
    .await;
    h.ingest("Company", "semmapas", "launch", LAUNCH_TEXT).await;

    h.llm.push_response("Portuguese");
    h.llm.push_response("Em Portugal.");
    let result = h
        .runtime
        .ask("Onde foi lançado o projeto launched Portugal?", ask_options("u1", false))
        .await
        .unwrap();

    let system = result.prompt[0].text_content();
    assert!(
        system.contains("European Portuguese (pt-PT)"),
        "alias should be applied: {system}"
    );
}

#[tokio::test]
async fn async_summarization_defers_the_summary_call() {
    let h = harness().await;
    h.ingest("Company", "semmapas", "launch", SEMMAPAS_TEXT).await;

    h.llm.push_response("SemMapas launched in 2023.");
    let options = AskOptions::builder()
        .prefix("Company")
        .index("semmapas")
        .session_id("u1")
        .persistent_memory(true)
        .async_memory_summarization(true)
        .build();
    let result = h
        .runtime
        .ask("Tell me about the SemMapas launch", options)
        .await
        .unwrap();
    assert!(!result.failed_to_respond);

    // The detached write lands shortly after the call returns.
    let mut stored = false;
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let readout = h
            .runtime
            .persistent_memory()
            .get_memory("u1", "launch")
            .await
            .unwrap();
        if readout.record.questions.len() == 1 {
            stored = true;
            break;
        }
    }
    assert!(stored, "detached memory write should complete");
}
