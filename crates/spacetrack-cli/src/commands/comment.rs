use clap::Subcommand;
use spacetrack_core::storage::NoteRepository;
use uuid::Uuid;

use super::{open_session, print_json, CliResult};

#[derive(Subcommand)]
pub enum CommentAction {
    /// Add a comment to the space
    Add {
        text: String,
    },
    /// List comments, newest first
    List,
}

pub fn run(action: CommentAction, space: Option<Uuid>) -> CliResult {
    let (controller, _) = open_session(space)?;

    match action {
        CommentAction::Add { text } => print_json(&controller.add_comment(&text)?)?,
        CommentAction::List => {
            print_json(&controller.store().list_comments(controller.space_id())?)?;
        }
    }
    Ok(())
}
