mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use tourfetch::config::Config;
use tourfetch::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    init_tracing(&config.telemetry.log_filter);

    match cli.command {
        Commands::Serve(args) => {
            let address = args.address.unwrap_or(config.server.bind_addr);
            tourfetch::api::run(address, config).await?
        }
        Commands::Discover(args) => {
            let state = tourfetch::api::build_state(config)?;
            let record = state.discoverer.discover(&args.url, None).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}
