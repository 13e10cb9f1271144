use anyhow::Result;
use tracing::{error, info};

use bounty_dashboard::config::{Command, Config};
use bounty_dashboard::{logging, web};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_args();

    // Handle version subcommand
    if let Some(Command::Version) = &config.command {
        println!(
            "bounty-dashboard {}, commit: {}, build_date: {}",
            env!("CARGO_PKG_VERSION"),
            env!("VERGEN_GIT_SHA"),
            env!("VERGEN_BUILD_TIMESTAMP"),
        );
        return Ok(());
    }

    // Initialize logging
    logging::init(&config.log_format, &config.log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("VERGEN_GIT_SHA"),
        build_date = env!("VERGEN_BUILD_TIMESTAMP"),
        storage_path = %config.storage_path,
        "bounty-dashboard starting"
    );

    // Validate configuration
    if let Err(e) = config.validate() {
        error!(error = %e, "Configuration validation failed");
        std::process::exit(1);
    }

    // Shutdown signal channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // Start web server
    let mut server = tokio::spawn(web::run(config, shutdown_rx));

    let finished = tokio::select! {
        joined = &mut server => Some(joined),
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(true);
            None
        }
    };

    // Wait for graceful shutdown to drain in-flight requests
    let result = match finished {
        Some(joined) => joined,
        None => server.await,
    };

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(error = %e, "Application error");
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "Server task failed");
            std::process::exit(1);
        }
    }

    info!("Shutdown complete");
    Ok(())
}
