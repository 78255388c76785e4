//! Common data types for pullsink.

pub mod validation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Unique message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Create a new random message ID.
    pub fn new() -> Self {
        MessageId(Uuid::new_v4().to_string())
    }

    /// Create a message ID from a string.
    pub fn from_string(s: String) -> Self {
        MessageId(s)
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One message pulled from a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    /// Handle used to acknowledge the message.
    pub ack_id: String,
    /// Service-assigned message ID.
    pub message_id: MessageId,
    /// Raw payload bytes.
    pub data: Vec<u8>,
    /// Message attributes.
    pub attributes: HashMap<String, String>,
    /// Publish timestamp, when reported.
    pub publish_time: Option<DateTime<Utc>>,
    /// Delivery attempt counter, when reported.
    pub delivery_attempt: Option<u32>,
}

/// Fully qualified subscription reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionRef {
    /// Project ID.
    pub project_id: String,
    /// Subscription ID.
    pub subscription: String,
}

impl SubscriptionRef {
    /// Create a subscription reference.
    pub fn new(project_id: impl Into<String>, subscription: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            subscription: subscription.into(),
        }
    }

    /// Resource path (`projects/{project}/subscriptions/{subscription}`).
    pub fn path(&self) -> String {
        format!(
            "projects/{}/subscriptions/{}",
            self.project_id, self.subscription
        )
    }
}

impl fmt::Display for SubscriptionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Fully qualified table reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    /// Project ID.
    pub project_id: String,
    /// Dataset ID.
    pub dataset: String,
    /// Table ID.
    pub table: String,
}

impl TableRef {
    /// Create a table reference.
    pub fn new(
        project_id: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset, self.table)
    }
}

/// Column layout of a destination table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Column names in schema order.
    pub columns: Vec<String>,
}

impl TableSchema {
    /// Create a schema from column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// The `(original, transformed)` pair appended to the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    /// Decoded payload as received.
    pub original: String,
    /// Transformed text (`"<WORD> <scaled-digits>"`).
    pub transformed: String,
}

impl OutputRow {
    /// Create a row.
    pub fn new(original: impl Into<String>, transformed: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            transformed: transformed.into(),
        }
    }
}
