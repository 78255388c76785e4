//! The fetch, transform and sink pipeline.
//!
//! One run pulls at most one message, transforms it and appends one row:
//!
//! ```text
//! Fetch -> Transform -> Sink -> (Acknowledge) -> Done
//!   \__________\__________\________________________-> Failed
//! ```
//!
//! Every failure is returned to the caller; there are no retries. When the
//! message is acknowledged depends on the configured [`AckPolicy`].

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::bigquery::RowSink;
use crate::config::{AckPolicy, RelayConfig};
use crate::metrics::get_metrics;
use crate::pubsub::MessageSource;
use crate::transform::{TransformedRecord, decode_payload, transform};
use crate::types::{MessageId, OutputRow, QueueItem, TableRef};
use crate::{Error, Result};

/// Callback invoked with the decoded payload before it is transformed.
pub type PayloadHook = Box<dyn Fn(&str) + Send + Sync>;

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// ID of the processed message.
    pub message_id: MessageId,
    /// Transformed fields.
    pub transformed: TransformedRecord,
    /// Row appended to the table.
    pub row: OutputRow,
    /// Whether the message was acknowledged.
    pub acknowledged: bool,
}

/// Single-message relay from a [`MessageSource`] to a [`RowSink`].
pub struct Pipeline {
    source: Arc<dyn MessageSource>,
    sink: Arc<dyn RowSink>,
    table: TableRef,
    ack_policy: AckPolicy,
    on_payload: Option<PayloadHook>,
}

impl Pipeline {
    /// Create a pipeline writing to `table` with the default ack policy.
    pub fn new(source: Arc<dyn MessageSource>, sink: Arc<dyn RowSink>, table: TableRef) -> Self {
        Self {
            source,
            sink,
            table,
            ack_policy: AckPolicy::default(),
            on_payload: None,
        }
    }

    /// Create a pipeline using the table and ack policy from `config`.
    pub fn from_config(
        config: &RelayConfig,
        source: Arc<dyn MessageSource>,
        sink: Arc<dyn RowSink>,
    ) -> Self {
        Self::new(source, sink, config.bigquery.table_ref()).with_ack_policy(config.ack_policy)
    }

    /// Set the ack policy.
    pub fn with_ack_policy(mut self, ack_policy: AckPolicy) -> Self {
        self.ack_policy = ack_policy;
        self
    }

    /// Register a callback that sees the decoded payload.
    pub fn on_payload(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_payload = Some(Box::new(hook));
        self
    }

    /// Destination table.
    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// Ack policy in effect.
    pub fn ack_policy(&self) -> AckPolicy {
        self.ack_policy
    }

    /// Run the pipeline once.
    pub async fn run_once(&self) -> Result<RunReport> {
        let result = self.execute().await;
        if let Err(e) = &result {
            get_metrics().failures_total.with_label_values(&[e.kind()]).inc();
        }
        result
    }

    async fn execute(&self) -> Result<RunReport> {
        let metrics = get_metrics();

        // Fetch
        let started = Instant::now();
        let item = self.fetch().await?;
        observe_stage("fetch", started);
        metrics.messages_pulled_total.inc();
        info!(
            message_id = %item.message_id,
            subscription = %self.source.subscription(),
            "Pulled message"
        );

        let mut acknowledged = false;
        if self.ack_policy == AckPolicy::Immediately {
            acknowledged = self.acknowledge(&item).await;
        }

        // Transform
        let started = Instant::now();
        let text = decode_payload(&item.data)?;
        if let Some(hook) = &self.on_payload {
            hook(text);
        }
        let transformed = transform(text)?;
        let row = OutputRow::new(text, transformed.to_string());
        observe_stage("transform", started);
        debug!(original = %row.original, transformed = %row.transformed, "Transformed payload");

        // Sink
        let started = Instant::now();
        let schema = self.sink.resolve_table(&self.table).await?;
        self.sink.insert_row(&self.table, &schema, &row).await?;
        observe_stage("sink", started);
        metrics.rows_inserted_total.inc();
        info!(table = %self.table, "Row inserted");

        if self.ack_policy == AckPolicy::AfterWrite {
            acknowledged = self.acknowledge(&item).await;
        }

        Ok(RunReport {
            message_id: item.message_id,
            transformed,
            row,
            acknowledged,
        })
    }

    async fn fetch(&self) -> Result<QueueItem> {
        let subscription = self.source.subscription();
        self.source
            .pull(1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmptyQueue(subscription.path()))
    }

    /// Acknowledge `item`. A failure leaves the message redeliverable and is
    /// logged rather than returned, since by then the row may already be written.
    async fn acknowledge(&self, item: &QueueItem) -> bool {
        let started = Instant::now();
        match self.source.acknowledge(std::slice::from_ref(&item.ack_id)).await {
            Ok(()) => {
                observe_stage("ack", started);
                get_metrics().messages_acked_total.inc();
                debug!(message_id = %item.message_id, "Message acknowledged");
                true
            }
            Err(e) => {
                warn!(
                    message_id = %item.message_id,
                    error = %e,
                    "Failed to acknowledge message; it will be redelivered"
                );
                false
            }
        }
    }
}

fn observe_stage(stage: &str, started: Instant) {
    get_metrics()
        .stage_latency_seconds
        .with_label_values(&[stage])
        .observe(started.elapsed().as_secs_f64());
}
