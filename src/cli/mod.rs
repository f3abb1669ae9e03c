//! Command line interface for scorekv
//!
//! A one-shot client over the binary protocol, printing responses in the
//! canonical textual rendering.

pub mod client;
pub mod commands;

pub use client::{render, CliClient};
pub use commands::Cli;
