use clap::Subcommand;
use spacetrack_core::storage::NoteRepository;
use uuid::Uuid;

use super::{open_session, print_json, CliResult};

#[derive(Subcommand)]
pub enum TodoAction {
    /// Add a to-do item
    Add {
        text: String,
    },
    /// List to-do items
    List {
        /// Hide completed items
        #[arg(long)]
        open: bool,
    },
    /// Flip an item between done and not done
    Toggle {
        /// To-do ID
        id: Uuid,
    },
}

pub fn run(action: TodoAction, space: Option<Uuid>) -> CliResult {
    let (controller, _) = open_session(space)?;

    match action {
        TodoAction::Add { text } => print_json(&controller.add_todo(&text)?)?,
        TodoAction::List { open } => {
            let mut todos = controller.store().list_todos(controller.space_id())?;
            if open {
                todos.retain(|t| !t.completed);
            }
            print_json(&todos)?;
        }
        TodoAction::Toggle { id } => print_json(&controller.toggle_todo(id)?)?,
    }
    Ok(())
}
