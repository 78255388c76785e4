//! Integration tests for the relay pipeline with in-memory source and sink.

use pullsink::Error;
use pullsink::bigquery::InMemoryTable;
use pullsink::config::{AckPolicy, RelayConfig};
use pullsink::error::{InsertError, TransformError};
use pullsink::pipeline::Pipeline;
use pullsink::pubsub::InMemorySubscription;
use pullsink::types::{OutputRow, SubscriptionRef, TableRef};
use std::sync::{Arc, Mutex};

/// Helper to create the default subscription
fn create_subscription() -> InMemorySubscription {
    InMemorySubscription::new(SubscriptionRef::new("local-project", "demo-subscription"))
}

/// Helper to create the default table
fn create_table() -> InMemoryTable {
    InMemoryTable::with_default_schema(TableRef::new("local-project", "demo", "demo_result"))
}

/// Helper to build a pipeline over the default config
fn create_pipeline(
    subscription: &InMemorySubscription,
    table: &InMemoryTable,
    ack_policy: AckPolicy,
) -> Pipeline {
    let config = RelayConfig {
        ack_policy,
        ..Default::default()
    };
    Pipeline::from_config(
        &config,
        Arc::new(subscription.clone()),
        Arc::new(table.clone()),
    )
}

fn rejection() -> Vec<InsertError> {
    vec![InsertError {
        index: 0,
        reason: "invalid".to_string(),
        location: Some("transformed".to_string()),
        message: "no such field".to_string(),
    }]
}

/// Scenario: "hello 12" is appended as ("hello 12", "HELLO 1020").
#[tokio::test]
async fn test_relay_hello() {
    let subscription = create_subscription();
    let table = create_table();
    let id = subscription.publish("hello 12").await;

    let report = create_pipeline(&subscription, &table, AckPolicy::AfterWrite)
        .run_once()
        .await
        .expect("run should succeed");

    assert_eq!(report.message_id, id);
    assert_eq!(report.row, OutputRow::new("hello 12", "HELLO 1020"));
    assert_eq!(report.transformed.upper_word, "HELLO");
    assert_eq!(table.rows().await, vec![OutputRow::new("hello 12", "HELLO 1020")]);
}

/// Scenario: "Go 5" is appended as ("Go 5", "GO 50").
#[tokio::test]
async fn test_relay_go() {
    let subscription = create_subscription();
    let table = create_table();
    subscription.publish("Go 5").await;

    create_pipeline(&subscription, &table, AckPolicy::AfterWrite)
        .run_once()
        .await
        .expect("run should succeed");

    assert_eq!(table.rows().await, vec![OutputRow::new("Go 5", "GO 50")]);
}

/// Scenario: an empty subscription reports EmptyQueue and writes nothing.
#[tokio::test]
async fn test_empty_subscription() {
    let subscription = create_subscription();
    let table = create_table();

    let err = create_pipeline(&subscription, &table, AckPolicy::AfterWrite)
        .run_once()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::EmptyQueue(ref path) if path == "projects/local-project/subscriptions/demo-subscription"
    ));
    assert_eq!(err.exit_code(), 2);
    assert!(table.rows().await.is_empty());
}

/// Scenario: a payload without a space is malformed and writes nothing.
#[tokio::test]
async fn test_single_token_payload() {
    let subscription = create_subscription();
    let table = create_table();
    subscription.publish("onlyoneword").await;

    let err = create_pipeline(&subscription, &table, AckPolicy::AfterWrite)
        .run_once()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::MalformedInput(TransformError::TokenCount { count: 1 })
    ));
    assert_eq!(err.exit_code(), 3);
    assert!(table.rows().await.is_empty());
}

/// Scenario: a non-digit in the numeric token is malformed and writes nothing.
#[tokio::test]
async fn test_non_digit_payload() {
    let subscription = create_subscription();
    let table = create_table();
    subscription.publish("word 12a").await;

    let err = create_pipeline(&subscription, &table, AckPolicy::AfterWrite)
        .run_once()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::MalformedInput(TransformError::NonDigit { ch: 'a', .. })
    ));
    assert!(table.rows().await.is_empty());
}

/// Scenario: a payload that is not UTF-8 is malformed.
#[tokio::test]
async fn test_non_utf8_payload() {
    let subscription = create_subscription();
    let table = create_table();
    subscription.publish(vec![0xffu8, 0x20, 0x31]).await;

    let err = create_pipeline(&subscription, &table, AckPolicy::AfterWrite)
        .run_once()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::MalformedInput(TransformError::InvalidUtf8(_))
    ));
}

/// Scenario: the table reports insert errors, the run fails with Write.
#[tokio::test]
async fn test_rejected_insert() {
    let subscription = create_subscription();
    let table = create_table();
    table.reject_inserts(rejection()).await;
    subscription.publish("hello 12").await;

    let err = create_pipeline(&subscription, &table, AckPolicy::AfterWrite)
        .run_once()
        .await
        .unwrap_err();

    match &err {
        Error::Write { table: name, errors } => {
            assert_eq!(name, "local-project.demo.demo_result");
            assert_eq!(errors, &rejection());
        }
        other => panic!("expected Write error, got {:?}", other),
    }
    assert_eq!(err.exit_code(), 4);
    assert!(table.rows().await.is_empty());
}

/// The payload hook sees the decoded text before the transform runs.
#[tokio::test]
async fn test_payload_hook_runs_before_transform() {
    let subscription = create_subscription();
    let table = create_table();
    subscription.publish("onlyoneword").await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let pipeline = create_pipeline(&subscription, &table, AckPolicy::AfterWrite)
        .on_payload(move |text| sink.lock().unwrap().push(text.to_string()));

    assert!(pipeline.run_once().await.is_err());
    assert_eq!(*seen.lock().unwrap(), vec!["onlyoneword".to_string()]);
}

/// Only one message is consumed per run.
#[tokio::test]
async fn test_one_message_per_run() {
    let subscription = create_subscription();
    let table = create_table();
    subscription.publish("a 1").await;
    subscription.publish("b 2").await;

    let pipeline = create_pipeline(&subscription, &table, AckPolicy::AfterWrite);
    pipeline.run_once().await.unwrap();

    assert_eq!(table.rows().await, vec![OutputRow::new("a 1", "A 10")]);
    assert_eq!(subscription.pending_count().await, 1);

    pipeline.run_once().await.unwrap();
    assert_eq!(table.rows().await.len(), 2);
    assert!(matches!(pipeline.run_once().await, Err(Error::EmptyQueue(_))));
}

/// Default policy: acknowledge only after a successful write (at-least-once).
#[tokio::test]
async fn test_after_write_acks_on_success_only() {
    let subscription = create_subscription();
    let table = create_table();
    let id = subscription.publish("hello 12").await;
    table.reject_inserts(rejection()).await;

    let pipeline = create_pipeline(&subscription, &table, AckPolicy::AfterWrite);
    assert!(matches!(pipeline.run_once().await, Err(Error::Write { .. })));
    assert!(subscription.acked().await.is_empty());
    assert_eq!(subscription.outstanding_count().await, 1);

    // Ack deadline passes, the message comes back and the retry succeeds.
    assert_eq!(subscription.redeliver().await, 1);
    table.accept_inserts().await;

    let report = pipeline.run_once().await.unwrap();
    assert!(report.acknowledged);
    assert_eq!(subscription.acked().await, vec![id]);
    assert_eq!(subscription.outstanding_count().await, 0);
    assert_eq!(table.rows().await.len(), 1);
}

/// Malformed input is never acknowledged under the default policy.
#[tokio::test]
async fn test_after_write_leaves_malformed_unacked() {
    let subscription = create_subscription();
    let table = create_table();
    subscription.publish("word 12a").await;

    let pipeline = create_pipeline(&subscription, &table, AckPolicy::AfterWrite);
    assert!(pipeline.run_once().await.is_err());
    assert!(subscription.acked().await.is_empty());
    assert_eq!(subscription.outstanding_count().await, 1);
}

/// Immediate policy: acknowledged as soon as it is pulled, even if the write fails.
#[tokio::test]
async fn test_immediately_acks_before_processing() {
    let subscription = create_subscription();
    let table = create_table();
    let id = subscription.publish("hello 12").await;
    table.reject_inserts(rejection()).await;

    let pipeline = create_pipeline(&subscription, &table, AckPolicy::Immediately);
    assert!(matches!(pipeline.run_once().await, Err(Error::Write { .. })));

    assert_eq!(subscription.acked().await, vec![id]);
    assert_eq!(subscription.redeliver().await, 0);
    assert!(table.rows().await.is_empty());
}

/// Never policy: the message stays outstanding after a successful write.
#[tokio::test]
async fn test_never_leaves_message_outstanding() {
    let subscription = create_subscription();
    let table = create_table();
    subscription.publish("hello 12").await;

    let report = create_pipeline(&subscription, &table, AckPolicy::Never)
        .run_once()
        .await
        .unwrap();

    assert!(!report.acknowledged);
    assert!(subscription.acked().await.is_empty());
    assert_eq!(subscription.outstanding_count().await, 1);
    assert_eq!(table.rows().await.len(), 1);
}

/// Pull errors surface unchanged and nothing is written.
#[tokio::test]
async fn test_pull_failure() {
    let subscription = create_subscription();
    let table = create_table();
    subscription.publish("hello 12").await;
    subscription.fail_next_pull("service unavailable").await;

    let err = create_pipeline(&subscription, &table, AckPolicy::AfterWrite)
        .run_once()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Api { status: 503, .. }));
    assert_eq!(err.exit_code(), 1);
    assert!(table.rows().await.is_empty());
    assert_eq!(subscription.pending_count().await, 1);
}

/// A pipeline pointed at a missing table fails before writing.
#[tokio::test]
async fn test_missing_table() {
    let subscription = create_subscription();
    let table = create_table();
    subscription.publish("hello 12").await;

    let pipeline = Pipeline::new(
        Arc::new(subscription.clone()),
        Arc::new(table.clone()),
        TableRef::new("local-project", "demo", "missing"),
    );

    assert!(matches!(
        pipeline.run_once().await,
        Err(Error::TableNotFound(ref name)) if name == "local-project.demo.missing"
    ));
    assert!(table.rows().await.is_empty());
}
