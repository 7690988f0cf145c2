//! storage-tour - Azure Storage walkthrough
//!
//! Runs the blob, table, file share and queue operation groups against the
//! storage account named by the configured connection string.

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

use storage_tour::cli::Cli;
use storage_tour::error::Result;

type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging; the level is raised once the config is known
    let filter = init_logging(cli.debug);

    // Execute the command
    if let Err(e) = run(cli, filter).await {
        error!("Error: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, filter: FilterHandle) -> Result<()> {
    info!("Starting storage-tour");

    let config = cli.resolve_config().await?;
    if config.debug && !cli.debug {
        if let Err(e) = filter.reload(env_filter(true)) {
            warn!("Could not raise log level: {}", e);
        }
    }

    cli.execute(config).await
}

fn init_logging(debug: bool) -> FilterHandle {
    let (filter, handle) = reload::Layer::new(env_filter(debug));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    handle
}

/// `RUST_LOG` wins; otherwise the crate logs at info, or debug when asked
fn env_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive(debug).into())
}

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "storage_tour=debug"
    } else {
        "storage_tour=info"
    }
}
