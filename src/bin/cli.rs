//! scorekv CLI client binary
//!
//! Frames one command, prints the tagged response, exits.

use clap::Parser;
use scorekv::cli::{render, Cli, CliClient};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> scorekv::Result<()> {
    let mut client = CliClient::connect(&cli.address).await?;
    let response = client.request(&cli.command).await?;
    println!("{}", render(&response));
    Ok(())
}
