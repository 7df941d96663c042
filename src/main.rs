//! Wiki server binary.
//!
//! Loads configuration, builds the wiki application over an in-memory store
//! and serves it until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use wiki_dispatch::lifecycle::startup;
use wiki_dispatch::observability::logging;

#[derive(Parser)]
#[command(name = "wiki-dispatch")]
#[command(about = "Wiki server with pluggable routing, hooks and rendering engines", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Print the route table and exit.
    #[arg(long)]
    dump_routes: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = startup::load(cli.config.as_deref(), cli.bind)?;
    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "wiki-dispatch starting");

    let app = startup::build_application(&config, Arc::new(startup::seed_store()))?;
    if cli.dump_routes {
        println!("{}", app.routes().dump());
        return Ok(());
    }

    startup::run(config, Arc::new(app)).await?;
    Ok(())
}
