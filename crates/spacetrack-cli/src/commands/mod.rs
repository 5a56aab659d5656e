pub mod action;
pub mod clock;
pub mod comment;
pub mod config;
pub mod log;
pub mod multistep;
pub mod space;
pub mod stats;
pub mod todo;
pub mod waste;

use serde::Serialize;
use spacetrack_core::storage::Database;
use spacetrack_core::{Config, SessionController};
use uuid::Uuid;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `--space` if given, else the configured current space.
pub fn resolve_space(space: Option<Uuid>, config: &Config) -> CliResult<Uuid> {
    space.or(config.current_space).ok_or_else(|| {
        "no space selected; pass --space or run `spacetrack space use <id>`".into()
    })
}

/// Open the database and load the selected space's session.
pub fn open_session(space: Option<Uuid>) -> CliResult<(SessionController<Database>, Config)> {
    let config = Config::load()?;
    let space_id = resolve_space(space, &config)?;
    let db = Database::open()?;
    let controller = SessionController::load(db, space_id, config.engine.clone())?;
    Ok((controller, config))
}
