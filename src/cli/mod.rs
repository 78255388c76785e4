// CLI module for pullsink
/// Command execution handlers
pub mod commands;
/// Output formatting utilities
pub mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::Result;
use crate::config::{LogFormat, RelayConfig};

/// Command-line interface for pullsink
#[derive(Parser)]
#[command(name = "pullsink")]
#[command(author, version, about = "Relay one Pub/Sub message into a BigQuery table", long_about = None)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pull one message, transform it and insert the row
    Run {
        /// Configuration overrides
        #[command(flatten)]
        config: ConfigArgs,

        /// Print Prometheus metrics after the run
        #[arg(long, env = "PULLSINK_METRICS")]
        metrics: bool,
    },

    /// Transform a payload locally without touching any service
    Transform {
        /// Payload text, e.g. "hello 12"
        payload: String,
    },

    /// Show the effective configuration
    Config {
        /// Configuration overrides
        #[command(flatten)]
        config: ConfigArgs,

        /// Output format (table | json)
        #[arg(long, short, default_value = "table")]
        format: String,
    },
}

/// Configuration sources shared by commands that talk to the services.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// TOML configuration file
    #[arg(long, env = "PULLSINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Project for both the subscription and the table
    #[arg(long, env = "PULLSINK_PROJECT")]
    pub project: Option<String>,

    /// Pub/Sub subscription ID
    #[arg(long, env = "PULLSINK_SUBSCRIPTION")]
    pub subscription: Option<String>,

    /// Project owning the BigQuery dataset (defaults to --project)
    #[arg(long, env = "PULLSINK_BIGQUERY_PROJECT")]
    pub bigquery_project: Option<String>,

    /// BigQuery dataset ID
    #[arg(long, env = "PULLSINK_DATASET")]
    pub dataset: Option<String>,

    /// BigQuery table ID
    #[arg(long, env = "PULLSINK_TABLE")]
    pub table: Option<String>,

    /// Pub/Sub REST endpoint (e.g. http://localhost:8086)
    #[arg(long, env = "PULLSINK_PUBSUB_ENDPOINT")]
    pub pubsub_endpoint: Option<String>,

    /// BigQuery REST endpoint
    #[arg(long, env = "PULLSINK_BIGQUERY_ENDPOINT")]
    pub bigquery_endpoint: Option<String>,

    /// OAuth 2.0 access token
    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// When to acknowledge the message (after-write | immediately | never)
    #[arg(long, env = "PULLSINK_ACK_POLICY")]
    pub ack_policy: Option<String>,

    /// Log level or filter directive
    #[arg(long, env = "PULLSINK_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log format (text | json)
    #[arg(long, env = "PULLSINK_LOG_FORMAT")]
    pub log_format: Option<String>,
}

impl ConfigArgs {
    /// Build the effective configuration: defaults, then the file, then flags.
    pub fn load(&self) -> Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::from_file(path)?,
            None => RelayConfig::default(),
        };
        self.apply(&mut config)?;
        Ok(config)
    }

    /// Apply flag and environment overrides to `config`.
    pub fn apply(&self, config: &mut RelayConfig) -> Result<()> {
        if let Some(project) = &self.project {
            config.pubsub.project_id = project.clone();
            config.bigquery.project_id = project.clone();
        }
        if let Some(project) = &self.bigquery_project {
            config.bigquery.project_id = project.clone();
        }
        if let Some(subscription) = &self.subscription {
            config.pubsub.subscription = subscription.clone();
        }
        if let Some(dataset) = &self.dataset {
            config.bigquery.dataset = dataset.clone();
        }
        if let Some(table) = &self.table {
            config.bigquery.table = table.clone();
        }
        if let Some(endpoint) = &self.pubsub_endpoint {
            config.pubsub.endpoint = Some(endpoint.clone());
        }
        if let Some(endpoint) = &self.bigquery_endpoint {
            config.bigquery.endpoint = Some(endpoint.clone());
        }
        if let Some(token) = &self.access_token {
            config.auth.access_token = Some(token.clone());
        }
        if let Some(policy) = &self.ack_policy {
            config.ack_policy = policy.parse()?;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.parse::<LogFormat>()?;
        }
        Ok(())
    }
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
