//! CLI argument definitions using clap

use clap::Parser;

/// One-shot client for a scorekv server: frames a single command, prints
/// the tagged response, and exits.
#[derive(Debug, Parser)]
#[command(
    name = "scorekv-cli",
    about = "Send one command to a scorekv server and print the tagged response",
    after_help = "Examples:\n  scorekv-cli set key1 5\n  scorekv-cli zadd zset 1.1 n1\n  scorekv-cli zquery zset 1 \"\" 0 10"
)]
pub struct Cli {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    pub address: String,

    /// Command followed by its arguments, e.g. `get key1`
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}
