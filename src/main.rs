use std::process::ExitCode;
use std::sync::Arc;

use milter_protocol::config::MilterConfig;
use milter_protocol::error::{ProtocolError, Result};
use milter_protocol::policy::{RecipientMap, RecipientPolicy};
use milter_protocol::transport::tcp::start_server;
use milter_protocol::utils::logging::init_logging;
use tracing::{error, info};

const USAGE: &str = "usage: recipmap-milter <mapfile> <port> | recipmap-milter --config <file>";

fn load_config() -> Result<MilterConfig> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = match args.as_slice() {
        [flag, path] if flag == "--config" => MilterConfig::from_file(path)?,
        [map, port] => {
            let port: u16 = port
                .parse()
                .map_err(|_| ProtocolError::ConfigError(format!("Invalid port: {port}")))?;
            let mut config = MilterConfig::default();
            config.server.address = format!("127.0.0.1:{port}");
            config.policy.recipient_map_path = Some(map.into());
            config
        }
        _ => return Err(ProtocolError::ConfigError(USAGE.to_string())),
    };
    config.apply_env();
    config.validate_strict()?;
    Ok(config)
}

async fn run(config: MilterConfig) -> Result<()> {
    let map = match &config.policy.recipient_map_path {
        Some(path) => RecipientMap::from_file(path)?,
        None => RecipientMap::new(),
    };
    let map = Arc::new(map);

    info!(app = %config.logging.app_name, recipients = map.len(), "Starting milter");
    start_server(&config, Arc::new(move || RecipientPolicy::new(Arc::clone(&map)))).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Milter stopped");
            ExitCode::FAILURE
        }
    }
}
