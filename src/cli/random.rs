//! Random secret CLI commands

use anyhow::{bail, Result};
use clap::Subcommand;

use super::output::{metadata_map, parse_metadata_entry, print_json, report};
use crate::resources::{RandomSecretModel, RandomSecretResource};
use crate::secrets::DEFAULT_RANDOM_SECRET_LENGTH;
use crate::vault::LogicalClient;

#[derive(Subcommand)]
pub enum RandomCommands {
    /// Generate a random secret and store it in Vault
    #[command(
        after_help = "EXAMPLES:\n    vaultprov random create --path secret/app/signing-key\n    vaultprov random create --path secret/app/token --length 64 --metadata owner=team-a"
    )]
    Create {
        /// Logical path of the secret, mount included
        #[arg(long, value_name = "PATH")]
        path: String,

        /// Length of the secret in bytes
        #[arg(long, default_value_t = DEFAULT_RANDOM_SECRET_LENGTH)]
        length: usize,

        /// Custom metadata entry, repeatable
        #[arg(long = "metadata", value_name = "KEY=VALUE", value_parser = parse_metadata_entry)]
        metadata: Vec<(String, String)>,
    },

    /// Show the state of a random secret
    Read {
        #[arg(long, value_name = "PATH")]
        path: String,
    },

    /// Replace the custom metadata of a random secret
    Update {
        #[arg(long, value_name = "PATH")]
        path: String,

        /// Custom metadata entry, repeatable. Omitted keys are removed.
        #[arg(long = "metadata", value_name = "KEY=VALUE", value_parser = parse_metadata_entry)]
        metadata: Vec<(String, String)>,
    },

    /// Soft-delete every active version of a random secret
    Delete {
        #[arg(long, value_name = "PATH")]
        path: String,
    },
}

pub async fn handle_random_command<C: LogicalClient>(
    command: RandomCommands,
    resource: &RandomSecretResource<C>,
) -> Result<()> {
    match command {
        RandomCommands::Create { path, length, metadata } => {
            let plan = RandomSecretModel { path, length, metadata: metadata_map(metadata) };
            let created = resource.create(&plan).await.map_err(report)?;
            print_json(&created)?;
        }
        RandomCommands::Read { path } => {
            let Some(state) = resource.import(&path).await.map_err(report)? else {
                bail!("random secret {} not found", path);
            };
            print_json(&state)?;
        }
        RandomCommands::Update { path, metadata } => {
            let Some(state) = resource.import(&path).await.map_err(report)? else {
                bail!("random secret {} not found", path);
            };
            let plan = RandomSecretModel { metadata: metadata_map(metadata), ..state.clone() };
            let updated = resource.update(&state, &plan).await.map_err(report)?;
            print_json(&updated)?;
        }
        RandomCommands::Delete { path } => {
            let state = RandomSecretModel::new(path);
            resource.delete(&state).await.map_err(report)?;
            print_json(&state)?;
        }
    }

    Ok(())
}
