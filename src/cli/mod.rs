//! # Command Line Interface
//!
//! Operator commands for managing random secrets and keypairs in Vault KV v2.

pub mod keypair;
pub mod output;
pub mod random;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::ProviderConfig;
use crate::observability::{init_logging, LoggingConfig};
use crate::provider::Provider;
use crate::secrets::SecretString;

#[derive(Parser)]
#[command(name = "vaultprov")]
#[command(about = "Provision generated secrets into Vault KV v2")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Vault address override
    #[arg(long, global = true)]
    pub address: Option<String>,

    /// Vault token override, debugging only
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Random secret commands
    Random {
        #[command(subcommand)]
        command: random::RandomCommands,
    },

    /// Keypair commands
    Keypair {
        #[command(subcommand)]
        command: keypair::KeypairCommands,
    },
}

impl Cli {
    /// Load configuration and apply command line overrides.
    pub fn provider_config(&self) -> anyhow::Result<ProviderConfig> {
        let mut config = ProviderConfig::load(self.config.as_deref())
            .context("Failed to load provider configuration")?;
        if let Some(address) = &self.address {
            config.address = address.clone();
        }
        if let Some(token) = &self.token {
            config.token = Some(SecretString::new(token.clone()));
        }
        Ok(config)
    }
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&LoggingConfig { verbose: cli.verbose, json: cli.json_logs });

    let config = cli.provider_config()?;
    let provider = Provider::configure(&config).await.map_err(output::report)?;

    match cli.command {
        Commands::Random { command } => {
            random::handle_random_command(command, &provider.random_secrets()).await?
        }
        Commands::Keypair { command } => {
            keypair::handle_keypair_command(command, &provider.keypair_secrets()).await?
        }
    }

    Ok(())
}
