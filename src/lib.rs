//! # pullsink
//!
//! Pulls one message from a GCP Pub/Sub subscription, transforms its
//! `"<word> <digits>"` payload, and appends the result to a BigQuery table.
//!
//! The three stages sit behind two seams, [`pubsub::MessageSource`] and
//! [`bigquery::RowSink`], with REST clients for the managed services (or
//! their emulators) and in-memory implementations for tests.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bigquery;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod pubsub;
pub mod transform;
pub mod types;

pub use error::{Error, Result};
