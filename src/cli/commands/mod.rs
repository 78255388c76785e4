// Commands module
/// Run command implementation
pub mod run;

use serde::Serialize;
use tabled::Tabled;

use crate::cli::{Commands, ConfigArgs, output::*};
use crate::config::RelayConfig;
use crate::logging;
use crate::transform::transform;

/// One configuration setting for display
#[derive(Debug, Serialize, Tabled)]
struct ConfigEntry {
    key: String,
    value: String,
}

/// Execute a CLI command
pub async fn execute_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run { config, metrics } => run::execute(config, metrics).await,
        Commands::Transform { payload } => execute_transform(&payload),
        Commands::Config { config, format } => execute_config(config, &format),
    }
}

/// Exit code for a failed command.
///
/// Pipeline errors keep their own codes (see [`crate::Error::exit_code`]);
/// everything else exits with 1.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    error
        .downcast_ref::<crate::Error>()
        .map(|e| e.exit_code())
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1)
}

fn execute_transform(payload: &str) -> anyhow::Result<()> {
    let record = transform(payload).map_err(crate::Error::from)?;
    println!("{}", record);
    Ok(())
}

fn execute_config(args: ConfigArgs, format: &str) -> anyhow::Result<()> {
    let config = args.load()?;
    logging::init(&config.logging);

    if let Err(e) = config.validate() {
        print_warning(&e.to_string());
    }

    print_list(&config_entries(&config), OutputFormat::parse(format))
}

fn config_entries(config: &RelayConfig) -> Vec<ConfigEntry> {
    let entry = |key: &str, value: String| ConfigEntry {
        key: key.to_string(),
        value,
    };
    let or_default = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    vec![
        entry("pubsub.project_id", config.pubsub.project_id.clone()),
        entry("pubsub.subscription", config.pubsub.subscription.clone()),
        entry("pubsub.endpoint", or_default(&config.pubsub.endpoint)),
        entry(
            "pubsub.return_immediately",
            config.pubsub.return_immediately.to_string(),
        ),
        entry("bigquery.project_id", config.bigquery.project_id.clone()),
        entry("bigquery.dataset", config.bigquery.dataset.clone()),
        entry("bigquery.table", config.bigquery.table.clone()),
        entry("bigquery.endpoint", or_default(&config.bigquery.endpoint)),
        entry("auth.access_token", config.auth.redacted_token().to_string()),
        entry("ack_policy", config.ack_policy.to_string()),
        entry("logging.level", config.logging.level.clone()),
        entry("logging.format", format!("{:?}", config.logging.format).to_lowercase()),
        entry("metrics.enabled", config.metrics.enabled.to_string()),
    ]
}
