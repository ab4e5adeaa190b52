//! Orchestrator runs against scripted and fault-injecting backends.

use chrono::NaiveDate;
use sop_core::{template, GenerationRequest, ReviewStatus, Speaker, SENTINEL};
use sop_generator::{
    extract, unified_diff, GeneratorConfig, SopGenerator, VersionStore, FALLBACK_WRITER_NOTE,
};
use sop_render::{render_to_bytes, RenderMetadata};
use sop_sim::{chat_reply, FaultConfig, FaultyBackend, ScriptedBackend};
use sop_transport::{ChatBackend, ClientConfig, TransportClient};

fn generator<B: ChatBackend>(backend: B) -> SopGenerator<B> {
    let config = ClientConfig::for_base("http://llm.test/v1").without_backoff();
    SopGenerator::new(TransportClient::new(backend, config), GeneratorConfig::default())
}

fn request() -> GenerationRequest {
    GenerationRequest::builder()
        .field("title", "Calibration of Scale X")
        .field("procedure", "Step A; Step B")
        .build()
}

fn speakers(outcome: &sop_core::ReviewOutcome) -> Vec<Speaker> {
    outcome.conversation.iter().map(|t| t.speaker).collect()
}

const CRITIQUE: &str = "ISSUE: Missing scope\nWHY: Scope is mandatory\nFIX: Add section 1\nBLOCKER: yes";

#[tokio::test]
async fn test_sentinel_on_first_critique_approves_draft() {
    let backend = ScriptedBackend::replies(["1. Scope\n2. Procedure", "S1", "S2", SENTINEL]);
    let generator = generator(backend);

    let outcome = generator.run(&request()).await;

    assert_eq!(outcome.status, ReviewStatus::Approved);
    assert!(!outcome.used_fallback);
    assert_eq!(outcome.final_text, "S1\n\nS2");
    assert!(outcome.feedback_items.is_empty());
    assert_eq!(
        speakers(&outcome),
        vec![Speaker::User, Speaker::Writer, Speaker::Writer, Speaker::Writer, Speaker::Critic]
    );

    let requests = generator.client().backend().requests();
    let budgets: Vec<u32> = requests.iter().map(|r| r.payload.max_tokens).collect();
    assert_eq!(budgets, vec![400, 700, 700, 500]);
    assert!(requests.iter().all(|r| r.payload.messages.len() == 2));
    assert!(requests[1].payload.messages[1].content.text().contains("'1. Scope'"));
}

#[tokio::test]
async fn test_critique_with_issues_triggers_one_revision() {
    let backend = ScriptedBackend::replies([
        "no headings here",
        "DRAFT",
        CRITIQUE,
        "REVISED",
        "ISSUE: Still missing\nWHY: x\nFIX: y\nBLOCKER: no",
    ]);
    let generator = generator(backend);

    let outcome = generator.run(&request()).await;

    assert_eq!(outcome.status, ReviewStatus::NeedsReview);
    assert_eq!(outcome.final_text, "REVISED");
    assert_eq!(outcome.feedback_items.len(), 1);
    assert_eq!(outcome.feedback_items[0].issue, "Missing scope");
    assert!(outcome.feedback_items[0].blocker);
    assert_eq!(outcome.conversation.len(), 6);

    let requests = generator.client().backend().requests();
    assert_eq!(requests[1].payload.max_tokens, 1500);
    let revision_prompt = requests[3].payload.messages[1].content.text();
    assert!(revision_prompt.contains("Название: Calibration of Scale X"));
    assert!(revision_prompt.ends_with(CRITIQUE));
    assert_eq!(requests[4].payload.max_tokens, 200);
}

#[tokio::test]
async fn test_sentinel_after_revision_approves_revision() {
    let backend = ScriptedBackend::replies(["1. Scope", "S1", CRITIQUE, "REVISED", " STATUS: OK \n"]);
    let outcome = generator(backend).run(&request()).await;

    assert_eq!(outcome.status, ReviewStatus::Approved);
    assert_eq!(outcome.final_text, "REVISED");
    assert_eq!(outcome.feedback_items.len(), 1);
}

#[tokio::test]
async fn test_outline_is_capped_at_eight_sections() {
    let outline: String = (1..=10).map(|i| format!("{i}. Section {i}\n")).collect();
    let mut replies = vec![outline];
    replies.extend((1..=8).map(|i| format!("body {i}")));
    replies.push(SENTINEL.to_string());
    let generator = generator(ScriptedBackend::replies(replies));

    let outcome = generator.run(&request()).await;

    assert_eq!(generator.client().backend().requests_count(), 10);
    assert_eq!(generator.client().backend().remaining(), 0);
    assert!(outcome.final_text.starts_with("body 1\n\n"));
    assert!(outcome.final_text.ends_with("body 8"));
    assert!(!outcome.final_text.contains("body 9"));
}

#[tokio::test]
async fn test_unreachable_service_falls_back_to_template() {
    let generator = generator(ScriptedBackend::always_failing());
    let request = request();

    let outcome = generator.run(&request).await;

    assert!(outcome.used_fallback);
    assert_eq!(outcome.status, ReviewStatus::Approved);
    assert_eq!(outcome.final_text, template::generate(request.fields()));
    assert!(outcome.feedback_items.is_empty());
    assert_eq!(
        speakers(&outcome),
        vec![Speaker::User, Speaker::System, Speaker::Writer, Speaker::Critic]
    );
    let turns = outcome.conversation.turns();
    assert!(turns[1].content.starts_with("LLM error: "));
    assert_eq!(turns[2].content, FALLBACK_WRITER_NOTE);
    assert_eq!(turns[3].content, SENTINEL);

    // Two endpoints, four tiers, two passes, then no further calls.
    assert_eq!(generator.client().backend().requests_count(), 16);
}

#[tokio::test]
async fn test_failure_mid_run_keeps_earlier_turns() {
    let backend = ScriptedBackend::new(vec![Ok(chat_reply("1. Scope\n2. Steps")), Ok(chat_reply("S1"))]);
    let outcome = generator(backend).run(&request()).await;

    assert!(outcome.used_fallback);
    assert_eq!(
        speakers(&outcome),
        vec![
            Speaker::User,
            Speaker::Writer,
            Speaker::Writer,
            Speaker::System,
            Speaker::Writer,
            Speaker::Critic
        ]
    );
    assert!(outcome.final_text.starts_with("Calibration of Scale X\n"));
}

#[tokio::test]
async fn test_fallback_document_renders_numbered_procedure() {
    let outcome = generator(ScriptedBackend::always_failing()).run(&request()).await;

    let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    let meta = RenderMetadata::titled("Calibration of Scale X").with_date(date);
    let bytes = render_to_bytes(&outcome.final_text, &meta).unwrap();
    let text = extract("x.docx", &bytes).text;

    assert!(text.contains("5. Порядок выполнения работ"));
    assert!(text.contains("Step A; Step B"));
    assert!(text.contains("10. Приложения"));
}

#[tokio::test]
async fn test_seeded_faults_never_break_a_run() {
    for seed in 1..=32u64 {
        let inner = ScriptedBackend::replies(["1. Scope\n2. Steps", "S1", "S2", CRITIQUE, "REVISED", SENTINEL]);
        let backend = FaultyBackend::new(inner, seed, FaultConfig::aggressive());
        let generator = generator(backend);

        let outcome = generator.run(&request()).await;

        assert!(!outcome.final_text.trim().is_empty(), "seed {seed}");
        if outcome.used_fallback {
            assert_eq!(outcome.status, ReviewStatus::Approved, "seed {seed}");
            assert_eq!(outcome.conversation.last().map(|t| t.speaker), Some(Speaker::Critic));
        }
        assert!(generator.client().backend().stats().requests_count > 0);
    }
}

#[tokio::test]
async fn test_versions_store_and_compare_runs() {
    let dir = tempfile::tempdir().unwrap();
    let store = VersionStore::open(dir.path()).unwrap();
    let meta = RenderMetadata::titled("Calibration of Scale X")
        .with_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());

    let fallback = generator(ScriptedBackend::always_failing()).run(&request()).await;
    let first = store.save(&fallback.final_text, &meta, fallback.status.version_label()).unwrap();

    let remote = generator(ScriptedBackend::replies(["1. Scope", "Scope text", SENTINEL]))
        .run(&request())
        .await;
    let second = store.save(&remote.final_text, &meta, remote.status.version_label()).unwrap();

    assert_eq!((first.index, second.index), (1, 2));
    assert!(first.docx_path.ends_with("001_approved.docx"));
    assert_eq!(store.list().unwrap().len(), 2);

    let patch = unified_diff(
        &store.read_text(&first).unwrap(),
        &store.read_text(&second).unwrap(),
        "v1",
        "v2",
    );
    assert!(patch.starts_with("--- v1\n+++ v2\n"));
    assert!(patch.contains("+Scope text"));
    assert!(patch.contains("-# 5. Порядок выполнения работ"));
}
