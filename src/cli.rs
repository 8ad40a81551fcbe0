use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tourfetch")]
#[command(about = "Bulk tour/GPX downloader", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to `config/tourfetch.toml`)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Enumerate one collection and print it as JSON
    Discover(DiscoverArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to bind to; overrides `server.bind_addr`
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct DiscoverArgs {
    /// Collection page URL
    pub url: String,
}
