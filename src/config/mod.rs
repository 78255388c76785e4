//! Configuration system for pullsink.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::Error;
use crate::types::validation::{
    validate_dataset_id, validate_endpoint, validate_project_id, validate_pubsub_subscription_id,
    validate_table_id,
};
use crate::types::{SubscriptionRef, TableRef};

/// Default Pub/Sub REST endpoint.
pub const DEFAULT_PUBSUB_ENDPOINT: &str = "https://pubsub.googleapis.com";

/// Default BigQuery REST endpoint.
pub const DEFAULT_BIGQUERY_ENDPOINT: &str = "https://bigquery.googleapis.com";

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Pub/Sub configuration.
    pub pubsub: PubsubConfig,
    /// BigQuery configuration.
    pub bigquery: BigQueryConfig,
    /// Credentials.
    pub auth: AuthConfig,
    /// When to acknowledge the pulled message.
    pub ack_policy: AckPolicy,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

/// Pub/Sub-specific configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PubsubConfig {
    /// Project owning the subscription.
    pub project_id: String,
    /// Subscription ID.
    pub subscription: String,
    /// REST endpoint override.
    pub endpoint: Option<String>,
    /// Ask the service to answer at once when nothing is pending.
    pub return_immediately: bool,
}

impl Default for PubsubConfig {
    fn default() -> Self {
        Self {
            project_id: "local-project".to_string(),
            subscription: "demo-subscription".to_string(),
            endpoint: None,
            return_immediately: true,
        }
    }
}

impl PubsubConfig {
    /// Subscription reference for this configuration.
    pub fn subscription_ref(&self) -> SubscriptionRef {
        SubscriptionRef::new(&self.project_id, &self.subscription)
    }

    /// Effective endpoint.
    ///
    /// An explicit endpoint wins; otherwise `emulator_host` (the value of
    /// `PUBSUB_EMULATOR_HOST`) selects a plain-HTTP emulator.
    pub fn resolve_endpoint(&self, emulator_host: Option<&str>) -> String {
        if let Some(endpoint) = &self.endpoint {
            return endpoint.trim_end_matches('/').to_string();
        }
        match emulator_host.filter(|h| !h.is_empty()) {
            Some(host) if host.starts_with("http://") || host.starts_with("https://") => {
                host.trim_end_matches('/').to_string()
            }
            Some(host) => format!("http://{}", host.trim_end_matches('/')),
            None => DEFAULT_PUBSUB_ENDPOINT.to_string(),
        }
    }
}

/// BigQuery-specific configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BigQueryConfig {
    /// Project owning the dataset.
    pub project_id: String,
    /// Dataset ID.
    pub dataset: String,
    /// Table ID.
    pub table: String,
    /// REST endpoint override.
    pub endpoint: Option<String>,
}

impl Default for BigQueryConfig {
    fn default() -> Self {
        Self {
            project_id: "local-project".to_string(),
            dataset: "demo".to_string(),
            table: "demo_result".to_string(),
            endpoint: None,
        }
    }
}

impl BigQueryConfig {
    /// Table reference for this configuration.
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.project_id, &self.dataset, &self.table)
    }

    /// Effective endpoint.
    pub fn resolve_endpoint(&self) -> String {
        self.endpoint
            .as_deref()
            .unwrap_or(DEFAULT_BIGQUERY_ENDPOINT)
            .trim_end_matches('/')
            .to_string()
    }
}

/// Credentials.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth 2.0 bearer token sent to both services. Emulators need none.
    pub access_token: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_token", &self.redacted_token())
            .finish()
    }
}

impl AuthConfig {
    /// Token for display purposes.
    pub fn redacted_token(&self) -> &'static str {
        if self.access_token.is_some() {
            "<redacted>"
        } else {
            "<none>"
        }
    }
}

/// When to acknowledge a pulled message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckPolicy {
    /// Acknowledge only after the row is written (at-least-once).
    #[default]
    AfterWrite,
    /// Acknowledge as soon as the message is pulled (at most one processing attempt).
    Immediately,
    /// Never acknowledge; the service redelivers after the ack deadline.
    Never,
}

impl FromStr for AckPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "after_write" => Ok(Self::AfterWrite),
            "immediately" => Ok(Self::Immediately),
            "never" => Ok(Self::Never),
            other => Err(Error::Config(format!(
                "unknown ack policy '{}' (expected after-write, immediately or never)",
                other
            ))),
        }
    }
}

impl fmt::Display for AckPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AfterWrite => "after-write",
            Self::Immediately => "immediately",
            Self::Never => "never",
        };
        f.write_str(s)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
    /// Log format (text or json).
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Log format enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain text format.
    #[default]
    Text,
    /// JSON format.
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(Error::Config(format!("unknown log format '{}'", other))),
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Print the Prometheus exposition after a run.
    pub enabled: bool,
}

impl RelayConfig {
    /// Load configuration from a TOML file.
    ///
    /// Sections and fields missing from the file keep their defaults.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e.message())))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(e.message().to_string()))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        validate_project_id(&self.pubsub.project_id)?;
        validate_pubsub_subscription_id(&self.pubsub.subscription)?;
        validate_project_id(&self.bigquery.project_id)?;
        validate_dataset_id(&self.bigquery.dataset)?;
        validate_table_id(&self.bigquery.table)?;

        if let Some(endpoint) = &self.pubsub.endpoint {
            validate_endpoint("pubsub.endpoint", endpoint)?;
        }
        if let Some(endpoint) = &self.bigquery.endpoint {
            validate_endpoint("bigquery.endpoint", endpoint)?;
        }
        if self.auth.access_token.as_deref() == Some("") {
            return Err(Error::Config("auth.access_token is empty".to_string()));
        }

        Ok(())
    }
}
