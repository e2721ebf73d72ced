//! Per-user selection commands.

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::output::{self, OutputFormat};
use roomhub_core::config::AppConfig;
use roomhub_core::error::AppError;
use roomhub_service::SelectionAllocator;

/// Arguments for selection commands
#[derive(Debug, Args)]
pub struct SelectionArgs {
    /// Selection subcommand
    #[command(subcommand)]
    pub command: SelectionCommand,
}

/// Selection subcommands
#[derive(Debug, Subcommand)]
pub enum SelectionCommand {
    /// Select a room for a user, moving any existing selection
    Set {
        /// User openid
        openid: String,
        /// Room ID
        room_id: String,
    },
    /// Drop a user's selection
    Clear {
        /// User openid
        openid: String,
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
    /// Show the room a user selected
    Show {
        /// User openid
        openid: String,
    },
}

/// JSON shape of a selection lookup
#[derive(Debug, Serialize)]
struct SelectionOutput<'a> {
    openid: &'a str,
    room_id: &'a str,
}

/// Execute selection commands
pub async fn execute(
    args: &SelectionArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let store = super::connect_store(config).await?;
    let lock = super::build_lock(config).await?;
    let allocator = SelectionAllocator::new(store, lock, &config.selection);

    match &args.command {
        SelectionCommand::Set { openid, room_id } => {
            let cancel = super::cancel_on_ctrl_c();
            let selection = allocator
                .set_selection_with_cancel(openid, room_id, &cancel)
                .await?;
            match format {
                OutputFormat::Json => output::print_json(&selection),
                OutputFormat::Table => output::print_success(&format!(
                    "{} now holds room {}",
                    selection.openid, selection.room_id
                )),
            }
        }
        SelectionCommand::Clear { openid, force } => {
            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Drop the room selection of {openid}?"))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let cancel = super::cancel_on_ctrl_c();
            let room_id = allocator.clear_selection_with_cancel(openid, &cancel).await?;
            match format {
                OutputFormat::Json => output::print_json(&SelectionOutput {
                    openid,
                    room_id: &room_id,
                }),
                OutputFormat::Table => {
                    output::print_success(&format!("Released room {room_id} held by {openid}"))
                }
            }
        }
        SelectionCommand::Show { openid } => {
            let room_id = allocator.get_selection(openid).await?;
            match format {
                OutputFormat::Json => output::print_json(&SelectionOutput {
                    openid,
                    room_id: &room_id,
                }),
                OutputFormat::Table => {
                    println!("Selection:");
                    output::print_kv("openid", openid);
                    output::print_kv("room", &room_id);
                }
            }
        }
    }

    Ok(())
}
