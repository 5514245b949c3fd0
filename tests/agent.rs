//! Full-turn dialogue flows through the service facade.

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;

use docloom::agent::{
    CLARIFICATION_MESSAGE, NO_DOCUMENTATION_MESSAGE, PROCESSING_FAILED_MESSAGE,
    STILL_PROCESSING_MESSAGE,
};
use docloom::embeddings::MockEmbeddingProvider;
use docloom::llm::ScriptedModel;
use docloom::service::DocAssistant;
use docloom::stores::{Database, JobStatus};
use docloom::Settings;

const DOCS_PAGE: &str = "<html><body><main>\
    <p>Install the toolkit with the bundled setup script.</p>\
    <p>Authentication uses bearer tokens issued from the dashboard.</p>\
    </main></body></html>";

async fn assistant_with(replies: &[&str]) -> (DocAssistant, Database) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let db = Database::open_in_memory().await.unwrap();
    let assistant = DocAssistant::with_database(
        db.clone(),
        &Settings::default(),
        Arc::new(MockEmbeddingProvider::new()),
        Arc::new(ScriptedModel::new(replies.iter().copied())),
    );
    (assistant, db)
}

async fn ingest(assistant: &DocAssistant, url: &str) {
    assistant.submit("conv1", url).await.unwrap();
    for _ in 0..100 {
        if let Some(job) = assistant.status("conv1").await.unwrap() {
            if job.status == JobStatus::Completed {
                return;
            }
            assert_ne!(job.status, JobStatus::Failed, "ingestion failed");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("ingestion never completed");
}

#[tokio::test]
async fn question_before_any_submission_is_gated() {
    let (assistant, db) = assistant_with(&[]).await;
    let reply = assistant.answer("conv1", "how do I install?").await;
    assert_eq!(reply, NO_DOCUMENTATION_MESSAGE);
    assert!(db.turns().turns("conv1").await.unwrap().is_empty());
}

#[tokio::test]
async fn question_during_processing_is_gated_without_side_effects() {
    let (assistant, db) = assistant_with(&[]).await;
    db.jobs().submit("conv1", "https://docs.example/guide").await.unwrap();

    let reply = assistant.answer("conv1", "how do I install?").await;
    assert_eq!(reply, STILL_PROCESSING_MESSAGE);
    assert!(db.turns().turns("conv1").await.unwrap().is_empty());
}

#[tokio::test]
async fn question_after_failed_job_suggests_retry() {
    let (assistant, db) = assistant_with(&[]).await;
    db.jobs().submit("conv1", "https://docs.example/guide").await.unwrap();
    db.jobs().set_status("conv1", JobStatus::Failed).await.unwrap();

    let reply = assistant.answer("conv1", "how do I install?").await;
    assert_eq!(reply, PROCESSING_FAILED_MESSAGE);
}

#[tokio::test]
async fn answered_question_lands_in_history() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/docs");
        then.status(200).body(DOCS_PAGE);
    });

    let (assistant, db) = assistant_with(&[
        "general_query",
        "Run the bundled setup script.",
    ])
    .await;
    ingest(&assistant, &server.url("/docs")).await;

    let reply = assistant.answer("conv1", "how do I install the toolkit?").await;
    assert_eq!(reply, "Run the bundled setup script.");

    let history = db.turns().history("conv1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].question, "how do I install the toolkit?");
    assert_eq!(history[0].answer, "Run the bundled setup script.");
}

#[tokio::test]
async fn follow_up_questions_accumulate_paired_history() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/docs");
        then.status(200).body(DOCS_PAGE);
    });

    let (assistant, db) = assistant_with(&[
        "general_query",
        "Tokens come from the dashboard.",
        "follow_up_question",
        "They expire after an hour.",
    ])
    .await;
    ingest(&assistant, &server.url("/docs")).await;

    assistant.answer("conv1", "where do tokens come from?").await;
    let reply = assistant.answer("conv1", "and when do they expire?").await;
    assert_eq!(reply, "They expire after an hour.");

    let history = db.turns().history("conv1").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].question, "and when do they expire?");
}

#[tokio::test]
async fn off_topic_question_gets_clarification_and_is_persisted() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/docs");
        then.status(200).body(DOCS_PAGE);
    });

    let (assistant, db) = assistant_with(&["unknown"]).await;
    ingest(&assistant, &server.url("/docs")).await;

    let reply = assistant.answer("conv1", "what's the weather like?").await;
    assert_eq!(reply, CLARIFICATION_MESSAGE);

    let history = db.turns().history("conv1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].answer, CLARIFICATION_MESSAGE);
}

#[tokio::test]
async fn code_question_reply_is_fenced() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/docs");
        then.status(200).body(DOCS_PAGE);
    });

    let (assistant, _db) = assistant_with(&[
        "code_query",
        "import toolkit\ntoolkit.setup()",
    ])
    .await;
    ingest(&assistant, &server.url("/docs")).await;

    let reply = assistant.answer("conv1", "show me the setup code").await;
    assert!(reply.starts_with("```"));
    assert!(reply.contains("toolkit.setup()"));
    assert!(reply.ends_with("```"));
}
