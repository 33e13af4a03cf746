mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use helpdesk_config::Config;
use helpdesk_storage::Storage;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    if let cli::Commands::Completions { shell } = cli.command {
        commands::completions::handle(shell);
        return Ok(());
    }

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = Config::load_from(&config_path)?.with_env_overrides()?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    if let cli::Commands::Config(cmd) = cli.command {
        return commands::config::handle(cmd, &config, &config_path);
    }

    let db_path = cli
        .db
        .or_else(|| config.database.path.clone())
        .unwrap_or_else(Storage::default_path);
    let storage = Storage::connect(&db_path, config.database.max_connections).await?;
    let service = commands::build_service(storage.clone(), &config);

    let result = match cli.command {
        cli::Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            commands::serve::handle(service, &config, host, port).await
        }
        cli::Commands::Ticket(cmd) => commands::ticket::handle(cmd, &service).await,
        cli::Commands::Config(_) | cli::Commands::Completions { .. } => Ok(()),
    };

    storage.close().await;
    result
}
