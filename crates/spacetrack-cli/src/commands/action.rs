use clap::Subcommand;
use spacetrack_core::storage::CatalogRepository;
use spacetrack_core::{CoreError, NewAction};
use uuid::Uuid;

use super::{open_session, print_json, CliResult};

#[derive(Subcommand)]
pub enum ActionAction {
    /// Define a new action
    Create {
        /// Action name
        name: String,
        /// Points credited per completion
        #[arg(long)]
        points: u32,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List the space's actions
    List,
    /// Record a completion (requires an active session)
    Record {
        /// Action ID
        id: Uuid,
        /// Bulk multiplier (see engine.allowed_multipliers)
        #[arg(long, short = 'x', default_value = "1")]
        multiplier: u32,
    },
}

pub fn run(action: ActionAction, space: Option<Uuid>) -> CliResult {
    let (controller, _) = open_session(space)?;
    let store = controller.store();

    match action {
        ActionAction::Create {
            name,
            points,
            description,
        } => {
            let created = store.create_action(NewAction {
                space_id: controller.space_id(),
                name,
                points,
                description,
            })?;
            eprintln!("Action created: {}", created.id);
            print_json(&created)?;
        }
        ActionAction::List => {
            print_json(&store.list_actions(controller.space_id())?)?;
        }
        ActionAction::Record { id, multiplier } => {
            let action = store
                .get_action(id)?
                .ok_or_else(|| CoreError::not_found("Action", id))?;
            print_json(&controller.record_action(&action, multiplier)?)?;
        }
    }
    Ok(())
}
