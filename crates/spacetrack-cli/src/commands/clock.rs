use std::time::Duration;

use clap::Subcommand;
use serde::Serialize;
use spacetrack_core::storage::Database;
use spacetrack_core::SessionController;
use uuid::Uuid;

use super::{open_session, print_json, CliResult};

#[derive(Subcommand)]
pub enum ClockAction {
    /// Start a session
    In,
    /// End the running session
    Out,
    /// Print the clock state as JSON
    Status,
    /// Print the elapsed time every tick until Ctrl-C
    Watch,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TickLine {
    elapsed_secs: u64,
    display: String,
}

/// `H:MM:SS`, hours unbounded.
fn format_elapsed(secs: u64) -> String {
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub fn run(action: ClockAction, space: Option<Uuid>) -> CliResult {
    let (controller, config) = open_session(space)?;

    match action {
        ClockAction::In => print_json(&controller.clock_in()?)?,
        ClockAction::Out => print_json(&controller.clock_out()?)?,
        ClockAction::Status => print_json(&controller.snapshot())?,
        ClockAction::Watch => {
            if !controller.is_clocked_in() {
                print_json(&controller.snapshot())?;
                return Ok(());
            }
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(watch(
                &controller,
                Duration::from_secs(config.engine.tick_interval_secs),
            ))?;
        }
    }
    Ok(())
}

async fn watch(controller: &SessionController<Database>, period: Duration) -> CliResult {
    let mut interval = tokio::time::interval(period);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let Some(elapsed_secs) = controller.tick() else {
                    break;
                };
                let line = TickLine {
                    elapsed_secs,
                    display: format_elapsed(elapsed_secs),
                };
                println!("{}", serde_json::to_string(&line)?);
            }
            _ = &mut ctrl_c => {
                tracing::debug!("watch interrupted");
                break;
            }
        }
    }
    Ok(())
}
