//! GCP Pub/Sub side of the relay.
//!
//! This module provides the fetch stage:
//! - [`MessageSource`], the seam the pipeline pulls through
//! - [`rest::PubsubRestClient`], a client for the Pub/Sub REST v1 API (or an emulator)
//! - [`memory::InMemorySubscription`], a local subscription for tests and embedding

use async_trait::async_trait;

use crate::Result;
use crate::types::{QueueItem, SubscriptionRef};

pub mod memory;
pub mod rest;

pub use memory::InMemorySubscription;
pub use rest::PubsubRestClient;

/// A subscription messages can be pulled from.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// The subscription this source reads.
    fn subscription(&self) -> &SubscriptionRef;

    /// Pull up to `max_messages` pending messages. An empty vector means nothing is pending.
    async fn pull(&self, max_messages: u32) -> Result<Vec<QueueItem>>;

    /// Acknowledge messages so they are not redelivered.
    async fn acknowledge(&self, ack_ids: &[String]) -> Result<()>;
}
