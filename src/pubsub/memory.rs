//! In-memory subscription.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::pubsub::MessageSource;
use crate::types::{MessageId, QueueItem, SubscriptionRef};
use crate::{Error, Result};

/// In-memory subscription.
///
/// Pulled messages stay outstanding until acknowledged; [`redeliver`](Self::redeliver)
/// stands in for the ack deadline expiring.
#[derive(Clone)]
pub struct InMemorySubscription {
    subscription: SubscriptionRef,
    inner: Arc<RwLock<SubscriptionData>>,
}

#[derive(Default)]
struct SubscriptionData {
    /// Messages waiting to be pulled.
    pending: VecDeque<StoredMessage>,
    /// Pulled but not yet acknowledged, keyed by ack ID.
    outstanding: HashMap<String, StoredMessage>,
    /// Acknowledged message IDs, in ack order.
    acked: Vec<MessageId>,
    /// Error returned by the next pull, if set.
    fail_next_pull: Option<String>,
}

#[derive(Clone)]
struct StoredMessage {
    id: MessageId,
    data: Vec<u8>,
    delivery_attempt: u32,
}

impl InMemorySubscription {
    /// Create an empty subscription.
    pub fn new(subscription: SubscriptionRef) -> Self {
        Self {
            subscription,
            inner: Arc::new(RwLock::new(SubscriptionData::default())),
        }
    }

    /// Publish a message; returns its ID.
    pub async fn publish(&self, data: impl Into<Vec<u8>>) -> MessageId {
        let id = MessageId::new();
        let mut inner = self.inner.write().await;
        inner.pending.push_back(StoredMessage {
            id: id.clone(),
            data: data.into(),
            delivery_attempt: 0,
        });
        id
    }

    /// Make the next pull fail with an API error.
    pub async fn fail_next_pull(&self, message: impl Into<String>) {
        self.inner.write().await.fail_next_pull = Some(message.into());
    }

    /// Return every outstanding message to the front of the queue.
    pub async fn redeliver(&self) -> usize {
        let mut inner = self.inner.write().await;
        let outstanding: Vec<StoredMessage> = inner.outstanding.drain().map(|(_, m)| m).collect();
        let count = outstanding.len();
        for message in outstanding {
            inner.pending.push_front(message);
        }
        count
    }

    /// Number of messages waiting to be pulled.
    pub async fn pending_count(&self) -> usize {
        self.inner.read().await.pending.len()
    }

    /// Number of pulled messages awaiting acknowledgment.
    pub async fn outstanding_count(&self) -> usize {
        self.inner.read().await.outstanding.len()
    }

    /// IDs of acknowledged messages.
    pub async fn acked(&self) -> Vec<MessageId> {
        self.inner.read().await.acked.clone()
    }
}

#[async_trait]
impl MessageSource for InMemorySubscription {
    fn subscription(&self) -> &SubscriptionRef {
        &self.subscription
    }

    async fn pull(&self, max_messages: u32) -> Result<Vec<QueueItem>> {
        let mut inner = self.inner.write().await;

        if let Some(message) = inner.fail_next_pull.take() {
            return Err(Error::Api {
                status: 503,
                message,
            });
        }

        let mut items = Vec::new();
        while items.len() < max_messages as usize {
            let Some(mut message) = inner.pending.pop_front() else {
                break;
            };
            message.delivery_attempt += 1;

            let ack_id = Uuid::new_v4().to_string();
            items.push(QueueItem {
                ack_id: ack_id.clone(),
                message_id: message.id.clone(),
                data: message.data.clone(),
                attributes: HashMap::new(),
                publish_time: Some(Utc::now()),
                delivery_attempt: Some(message.delivery_attempt),
            });
            inner.outstanding.insert(ack_id, message);
        }

        debug!(
            subscription = %self.subscription,
            count = items.len(),
            "Pulled from in-memory subscription"
        );

        Ok(items)
    }

    async fn acknowledge(&self, ack_ids: &[String]) -> Result<()> {
        let mut inner = self.inner.write().await;
        for ack_id in ack_ids {
            // Unknown or expired ack IDs are ignored, as the service does.
            if let Some(message) = inner.outstanding.remove(ack_id) {
                inner.acked.push(message.id);
            }
        }
        Ok(())
    }
}
