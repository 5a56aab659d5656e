use clap::Subcommand;
use spacetrack_core::storage::CatalogRepository;
use spacetrack_core::{CoreError, NewMultiStepAction};
use uuid::Uuid;

use super::{open_session, print_json, CliResult};

#[derive(Subcommand)]
pub enum MultistepAction {
    /// Define a checklist action
    Create {
        /// Action name
        name: String,
        /// Points credited per completed step
        #[arg(long)]
        points_per_step: u32,
        /// Step name, in order (repeat for each step)
        #[arg(long = "step", required = true)]
        steps: Vec<String>,
    },
    /// List the space's multi-step actions
    List,
    /// Complete the next step (requires an active session)
    Advance {
        /// Multi-step action ID
        id: Uuid,
    },
}

pub fn run(action: MultistepAction, space: Option<Uuid>) -> CliResult {
    let (controller, _) = open_session(space)?;
    let store = controller.store();

    match action {
        MultistepAction::Create {
            name,
            points_per_step,
            steps,
        } => {
            let created = store.create_multi_step_action(NewMultiStepAction {
                space_id: controller.space_id(),
                name,
                points_per_step,
                step_names: steps,
            })?;
            eprintln!("Multi-step action created: {}", created.id);
            print_json(&created)?;
        }
        MultistepAction::List => {
            print_json(&store.list_multi_step_actions(controller.space_id())?)?;
        }
        MultistepAction::Advance { id } => {
            let action = store
                .get_multi_step_action(id)?
                .ok_or_else(|| CoreError::not_found("MultiStepAction", id))?;
            print_json(&controller.advance_multi_step_action(&action)?)?;
        }
    }
    Ok(())
}
