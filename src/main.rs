use tracing::{error, info};

use fixfeed::config::Config;
use fixfeed::daemon;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Starting fixfeed");
    let config = Config::from_env();

    if let Err(e) = daemon::run(config).await {
        error!(error = %e, "Daemon terminated");
        std::process::exit(1);
    }
}
