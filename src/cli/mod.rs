//! CLI module for the geo search cache service
//!
//! Provides subcommands:
//! - `serve`: run the HTTP API
//! - `config`: print the effective configuration

pub mod config;
pub mod serve;

use clap::{Parser, Subcommand};

/// Location-aware search API with a result cache and per-caller admission gate
#[derive(Parser)]
#[command(name = "geo-search-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Print the effective configuration as JSON
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["geo-search-cache", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve));

        let cli = Cli::try_parse_from(["geo-search-cache", "config"]).unwrap();
        assert!(matches!(cli.command, Command::Config));

        assert!(Cli::try_parse_from(["geo-search-cache", "ui"]).is_err());
    }
}
