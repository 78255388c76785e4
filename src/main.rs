use std::process::ExitCode;

use pullsink::cli::output::print_error;
use pullsink::cli::{Cli, commands};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Execute the command
    match commands::execute_command(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&format!("{:#}", e));
            ExitCode::from(commands::exit_code(&e))
        }
    }
}
