use clap::Subcommand;
use spacetrack_core::storage::{Database, SpaceRepository};
use spacetrack_core::{Config, CoreError, NewSpace};
use uuid::Uuid;

use super::{open_session, print_json, CliResult};

#[derive(Subcommand)]
pub enum SpaceAction {
    /// Create a new space
    Create {
        /// Space name
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// What "done" looks like for this space
        #[arg(long)]
        goal: Option<String>,
        /// Reference to a "before" photo
        #[arg(long)]
        before_image: Option<String>,
        /// Reference to an "after" photo
        #[arg(long)]
        after_image: Option<String>,
        /// Also make it the current space
        #[arg(long)]
        select: bool,
    },
    /// List all spaces
    List,
    /// Print the session view of a space
    Show,
    /// Set the current space
    Use {
        /// Space ID
        id: Uuid,
    },
}

pub fn run(action: SpaceAction, space: Option<Uuid>) -> CliResult {
    match action {
        SpaceAction::Create {
            name,
            description,
            goal,
            before_image,
            after_image,
            select,
        } => {
            let db = Database::open()?;
            let created = db.create_space(NewSpace {
                name,
                description,
                goal,
                before_image,
                after_image,
            })?;
            if select {
                let mut config = Config::load()?;
                config.current_space = Some(created.id);
                config.save()?;
            }
            eprintln!("Space created: {}", created.id);
            print_json(&created)?;
        }
        SpaceAction::List => {
            let db = Database::open()?;
            print_json(&db.list_spaces()?)?;
        }
        SpaceAction::Show => {
            let (controller, _) = open_session(space)?;
            print_json(&controller.view()?)?;
        }
        SpaceAction::Use { id } => {
            let db = Database::open()?;
            if db.get_space(id)?.is_none() {
                return Err(CoreError::not_found("Space", id).into());
            }
            let mut config = Config::load()?;
            config.current_space = Some(id);
            config.save()?;
            println!("ok");
        }
    }
    Ok(())
}
