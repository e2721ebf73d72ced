//! Room listing and maintenance commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use roomhub_core::config::AppConfig;
use roomhub_core::error::AppError;
use roomhub_entity::room::{Room, RoomView};
use roomhub_service::{OccupancyReconciler, RoomCatalog};

/// Arguments for room commands
#[derive(Debug, Args)]
pub struct RoomArgs {
    /// Room subcommand
    #[command(subcommand)]
    pub command: RoomCommand,
}

/// Room subcommands
#[derive(Debug, Subcommand)]
pub enum RoomCommand {
    /// List available rooms on a day
    List {
        /// Day in YYYY-MM-DD form
        #[arg(long)]
        date: String,
    },
    /// List the days that have available rooms
    Dates,
    /// Rewrite drifted occupancy counters from the selection rows
    Reconcile,
}

/// Room display row
#[derive(Debug, Serialize, Tabled)]
struct RoomRow {
    /// Room ID
    id: String,
    /// Name
    name: String,
    /// Time
    time: String,
    /// Occupancy
    occupancy: String,
    /// Location
    location: String,
}

impl From<&Room> for RoomRow {
    fn from(room: &Room) -> Self {
        Self {
            id: room.room_id.clone(),
            name: room.name.clone(),
            time: room.scheduled_time.format("%H:%M").to_string(),
            occupancy: format!("{}/{}", room.occupancy, room.capacity),
            location: room.location.clone(),
        }
    }
}

/// Date display row
#[derive(Debug, Serialize, Tabled)]
struct DateRow {
    /// Date
    date: String,
}

/// Correction display row
#[derive(Debug, Serialize, Tabled)]
struct CorrectionRow {
    /// Room ID
    room_id: String,
    /// Recorded
    recorded: i32,
    /// Selections
    actual: i64,
    /// Written
    applied: i32,
}

/// Execute room commands
pub async fn execute(
    args: &RoomArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let store = super::connect_store(config).await?;

    match &args.command {
        RoomCommand::List { date } => {
            let catalog = RoomCatalog::new(store);
            let rooms = catalog.list_rooms_on(date).await?;
            let rows: Vec<RoomRow> = rooms.iter().map(RoomRow::from).collect();
            let views: Vec<RoomView> = rooms.into_iter().map(RoomView::from).collect();
            output::print_list(&rows, &views, format);
        }
        RoomCommand::Dates => {
            let catalog = RoomCatalog::new(store);
            let dates = catalog.list_available_dates().await?;
            let rows: Vec<DateRow> = dates
                .iter()
                .map(|d| DateRow {
                    date: d.format("%Y-%m-%d").to_string(),
                })
                .collect();
            output::print_list(&rows, &dates, format);
        }
        RoomCommand::Reconcile => {
            let lock = super::build_lock(config).await?;
            let reconciler = OccupancyReconciler::new(store, lock, &config.selection);
            let cancel = super::cancel_on_ctrl_c();
            let report = reconciler.reconcile_with_cancel(&cancel).await?;

            match format {
                OutputFormat::Json => output::print_json(&report),
                OutputFormat::Table => {
                    output::print_kv("rooms checked", &report.rooms_checked.to_string());
                    if report.is_consistent() {
                        output::print_success("Occupancy is consistent.");
                    } else {
                        let rows: Vec<CorrectionRow> = report
                            .corrections
                            .iter()
                            .map(|c| CorrectionRow {
                                room_id: c.room_id.clone(),
                                recorded: c.recorded,
                                actual: c.actual,
                                applied: c.applied,
                            })
                            .collect();
                        output::print_list(&rows, &report.corrections, format);
                        output::print_warning(&format!(
                            "Corrected {} room(s).",
                            report.corrections.len()
                        ));
                    }
                }
            }
        }
    }

    Ok(())
}
