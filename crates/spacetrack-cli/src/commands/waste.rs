use clap::Subcommand;
use spacetrack_core::storage::WasteRepository;
use uuid::Uuid;

use super::{open_session, print_json, CliResult};

#[derive(Subcommand)]
pub enum WasteAction {
    /// Log a waste observation
    Log {
        /// Waste category, e.g. "Waiting" or "Motion"
        category: String,
        #[arg(long)]
        points: u32,
    },
    /// List waste entries, newest first
    List,
}

pub fn run(action: WasteAction, space: Option<Uuid>) -> CliResult {
    let (controller, _) = open_session(space)?;

    match action {
        WasteAction::Log { category, points } => {
            print_json(&controller.log_waste(&category, points)?)?;
        }
        WasteAction::List => {
            print_json(&controller.store().list_waste(controller.space_id())?)?;
        }
    }
    Ok(())
}
