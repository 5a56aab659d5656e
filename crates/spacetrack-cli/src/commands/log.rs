use clap::Subcommand;
use spacetrack_core::storage::LogRepository;
use spacetrack_core::LogKind;
use uuid::Uuid;

use super::{open_session, print_json, CliResult};

#[derive(Subcommand)]
pub enum LogAction {
    /// List ledger entries, newest first
    List {
        /// Maximum entries (defaults to display.log_limit)
        #[arg(long)]
        limit: Option<usize>,
        /// Only entries of this kind: action, multiStepAction, clockIn, clockOut
        #[arg(long)]
        kind: Option<String>,
    },
}

pub fn run(action: LogAction, space: Option<Uuid>) -> CliResult {
    let (controller, config) = open_session(space)?;

    match action {
        LogAction::List { limit, kind } => {
            let kind = kind
                .map(|k| LogKind::parse(&k).ok_or_else(|| format!("unknown log kind: {k}")))
                .transpose()?;
            let limit = limit.unwrap_or(config.display.log_limit);
            let entries: Vec<_> = controller
                .store()
                .list_logs(controller.space_id())?
                .into_iter()
                .filter(|e| kind.map_or(true, |k| e.kind() == k))
                .take(limit)
                .collect();
            print_json(&entries)?;
        }
    }
    Ok(())
}
