//! scorekv server binary

use scorekv::logging::init_logging;
use scorekv::{Config, ScoreKvServer};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_logging(&config)?;

    let mut server = ScoreKvServer::new(config)?;
    let addr = server.start_with_addr().await?;
    info!("scorekv ready on {addr}");

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    server.shutdown().await?;

    Ok(())
}
