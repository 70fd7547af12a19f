//! tagconsent: inspect and change consent choices stored in a local cookie jar.

use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tagconsent_core::ConsentConfig;

mod commands;

use commands::Command;

fn resolve_data_dir() -> PathBuf {
    std::env::var("TAGCONSENT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match commands::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if command == Command::Help {
        commands::print_help();
        return Ok(());
    }

    let data_dir = resolve_data_dir();
    let measurement_id = std::env::var("TAGCONSENT_MEASUREMENT_ID")
        .unwrap_or_else(|_| "G-XXXXXXXXXX".to_string());
    let config = ConsentConfig::from_env(measurement_id)?;
    info!(
        "Using cookie jar in {} for {}",
        data_dir.display(),
        config.measurement_id
    );

    match commands::run(command, &data_dir, config).await {
        Ok(report) => {
            commands::print_report(&report);
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
