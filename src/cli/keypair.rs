//! Keypair CLI commands

use anyhow::{bail, Result};
use clap::Subcommand;

use super::output::{metadata_map, parse_metadata_entry, print_json, report};
use crate::resources::{KeypairSecretModel, KeypairSecretOrchestrator};
use crate::vault::LogicalClient;

#[derive(Subcommand)]
pub enum KeypairCommands {
    /// Generate a keypair and store both halves under a base path
    #[command(
        after_help = "EXAMPLES:\n    # Creates secret/keys/app/private and secret/keys/app/public\n    vaultprov keypair create --base-path secret/keys/app --metadata owner=team-a"
    )]
    Create {
        /// Base path, the halves are stored at <BASE_PATH>/private and <BASE_PATH>/public
        #[arg(long, value_name = "BASE_PATH")]
        base_path: String,

        /// Key algorithm
        #[arg(long = "type", default_value = "curve25519", value_parser = ["curve25519"])]
        key_type: String,

        /// Custom metadata entry, repeatable
        #[arg(long = "metadata", value_name = "KEY=VALUE", value_parser = parse_metadata_entry)]
        metadata: Vec<(String, String)>,
    },

    /// Show the state of a keypair
    Read {
        #[arg(long, value_name = "BASE_PATH")]
        base_path: String,
    },

    /// Replace the custom metadata of both halves
    Update {
        #[arg(long, value_name = "BASE_PATH")]
        base_path: String,

        /// Custom metadata entry, repeatable. Omitted keys are removed.
        #[arg(long = "metadata", value_name = "KEY=VALUE", value_parser = parse_metadata_entry)]
        metadata: Vec<(String, String)>,
    },

    /// Soft-delete both halves of a keypair
    Delete {
        #[arg(long, value_name = "BASE_PATH")]
        base_path: String,

        /// Confirm the deletion
        #[arg(long)]
        force_destroy: bool,
    },
}

pub async fn handle_keypair_command<C: LogicalClient>(
    command: KeypairCommands,
    orchestrator: &KeypairSecretOrchestrator<C>,
) -> Result<()> {
    match command {
        KeypairCommands::Create { base_path, key_type, metadata } => {
            let plan = KeypairSecretModel {
                base_path,
                key_type,
                metadata: metadata_map(metadata),
                force_destroy: false,
            };
            let created = orchestrator.create(&plan).await.map_err(report)?;
            print_json(&created)?;
        }
        KeypairCommands::Read { base_path } => {
            let Some(state) = orchestrator.import(&base_path).await.map_err(report)? else {
                bail!("keypair {} not found", base_path);
            };
            print_json(&state)?;
        }
        KeypairCommands::Update { base_path, metadata } => {
            let Some(state) = orchestrator.import(&base_path).await.map_err(report)? else {
                bail!("keypair {} not found", base_path);
            };
            let plan = KeypairSecretModel { metadata: metadata_map(metadata), ..state.clone() };
            let updated = orchestrator.update(&state, &plan).await.map_err(report)?;
            print_json(&updated)?;
        }
        KeypairCommands::Delete { base_path, force_destroy } => {
            let state = KeypairSecretModel { force_destroy, ..KeypairSecretModel::new(base_path) };
            orchestrator.delete(&state).await.map_err(report)?;
            print_json(&state)?;
        }
    }

    Ok(())
}
