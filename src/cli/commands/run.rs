// Run command implementation
use std::io::Write;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::info;

use crate::bigquery::{BigQueryRestClient, RowSink};
use crate::cli::ConfigArgs;
use crate::cli::output::print_warning;
use crate::config::{AckPolicy, RelayConfig};
use crate::logging;
use crate::metrics::get_metrics;
use crate::pipeline::Pipeline;
use crate::pubsub::{MessageSource, PubsubRestClient};

/// Confirmation printed after the row is appended.
pub const CONFIRMATION: &str = "New rows added.";

/// Execute the run command - one fetch, transform and insert
pub async fn execute(args: ConfigArgs, print_metrics: bool) -> Result<()> {
    let config = args.load()?;
    logging::init(&config.logging);
    config.validate()?;

    let emulator_host = std::env::var("PUBSUB_EMULATOR_HOST").ok();
    let source = PubsubRestClient::from_config(&config, emulator_host.as_deref())
        .context("Failed to create Pub/Sub client")?;
    let sink = BigQueryRestClient::from_config(&config).context("Failed to create BigQuery client")?;

    info!(
        pubsub_endpoint = source.endpoint(),
        bigquery_endpoint = sink.endpoint(),
        "Using service endpoints"
    );

    relay(
        &config,
        Arc::new(source),
        Arc::new(sink),
        print_metrics,
        &mut std::io::stdout(),
    )
    .await
}

/// Run the pipeline once and write its stdout contract to `out`.
///
/// The decoded payload comes first, whenever one was pulled. The confirmation
/// line follows only when the row was written.
pub async fn relay(
    config: &RelayConfig,
    source: Arc<dyn MessageSource>,
    sink: Arc<dyn RowSink>,
    print_metrics: bool,
    out: &mut impl Write,
) -> Result<()> {
    let subscription = source.subscription().clone();
    let payload = Arc::new(Mutex::new(None::<String>));
    let seen = Arc::clone(&payload);

    let pipeline = Pipeline::from_config(config, source, sink).on_payload(move |text| {
        if let Ok(mut slot) = seen.lock() {
            *slot = Some(text.to_string());
        }
    });

    info!(
        subscription = %subscription,
        table = %pipeline.table(),
        ack_policy = %pipeline.ack_policy(),
        "Starting relay run"
    );
    let result = pipeline.run_once().await;

    if let Some(text) = payload.lock().ok().and_then(|mut slot| slot.take()) {
        writeln!(out, "{}", text)?;
    }

    if print_metrics || config.metrics.enabled {
        write!(out, "{}", get_metrics().gather()?)?;
    }

    let report = result?;
    if !report.acknowledged && pipeline.ack_policy() != AckPolicy::Never {
        print_warning("Row was written but the message was not acknowledged; it may be redelivered");
    }

    writeln!(out, "{}", CONFIRMATION)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bigquery::InMemoryTable;
    use crate::cli::commands::exit_code;
    use crate::error::InsertError;
    use crate::pubsub::InMemorySubscription;

    fn create_fixture() -> (RelayConfig, InMemorySubscription, InMemoryTable) {
        let config = RelayConfig::default();
        let subscription = InMemorySubscription::new(config.pubsub.subscription_ref());
        let table = InMemoryTable::with_default_schema(config.bigquery.table_ref());
        (config, subscription, table)
    }

    async fn run(
        config: &RelayConfig,
        subscription: &InMemorySubscription,
        table: &InMemoryTable,
    ) -> (Result<()>, String) {
        let mut out = Vec::new();
        let result = relay(
            config,
            Arc::new(subscription.clone()),
            Arc::new(table.clone()),
            false,
            &mut out,
        )
        .await;
        (result, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_relay_prints_payload_then_confirmation() {
        let (config, subscription, table) = create_fixture();
        subscription.publish("hello 12").await;

        let (result, output) = run(&config, &subscription, &table).await;

        assert!(result.is_ok());
        assert_eq!(output, "hello 12\nNew rows added.\n");
        assert_eq!(table.rows().await.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_insert_prints_no_confirmation() {
        let (config, subscription, table) = create_fixture();
        subscription.publish("hello 12").await;
        table
            .reject_inserts(vec![InsertError {
                index: 0,
                reason: "invalid".to_string(),
                location: Some("transformed".to_string()),
                message: "no such field".to_string(),
            }])
            .await;

        let (result, output) = run(&config, &subscription, &table).await;

        let err = result.unwrap_err();
        assert_eq!(exit_code(&err), 4);
        assert_eq!(output, "hello 12\n");
        assert!(!output.contains(CONFIRMATION));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_printed_without_confirmation() {
        let (config, subscription, table) = create_fixture();
        subscription.publish("word 12a").await;

        let (result, output) = run(&config, &subscription, &table).await;

        assert_eq!(exit_code(&result.unwrap_err()), 3);
        assert_eq!(output, "word 12a\n");
        assert!(table.rows().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_subscription_prints_nothing() {
        let (config, subscription, table) = create_fixture();

        let (result, output) = run(&config, &subscription, &table).await;

        assert_eq!(exit_code(&result.unwrap_err()), 2);
        assert!(output.is_empty());
    }
}
