//! SQLite-backed repositories.
//!
//! Provides persistent storage for:
//! - Spaces and their clock markers / clocked-time aggregate
//! - The append-only action ledger
//! - Actions, multi-step actions, waste entries, to-dos and comments
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (nanosecond
//! precision, `Z` suffix) so that text ordering equals time ordering.

use std::fmt::Display;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::data_dir;
use super::migrations;
use super::traits::{
    CatalogRepository, LogRepository, NoteRepository, SpaceRepository, WasteRepository,
};
use crate::error::{CoreError, DatabaseError, Result};
use crate::model::{
    Action, ActionStep, Comment, LogEntry, LogEvent, LogKind, MultiStepAction, NewAction,
    NewComment, NewLogEntry, NewMultiStepAction, NewSpace, NewTodo, NewWasteEntry, Space,
    SpacePatch, Todo, WasteEntry,
};

// === Helper Functions ===

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn corrupt(table: &'static str, err: impl Display) -> CoreError {
    DatabaseError::CorruptRow {
        table,
        message: err.to_string(),
    }
    .into()
}

fn parse_ts(table: &'static str, s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(table, format!("bad timestamp '{s}': {e}")))
}

fn parse_opt_ts(table: &'static str, s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_ts(table, s)).transpose()
}

fn parse_id(table: &'static str, s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| corrupt(table, format!("bad id '{s}': {e}")))
}

const SPACE_COLUMNS: &str = "id, name, description, goal, before_image, after_image,
     date_created, date_modified, total_clocked_in_time, is_clocked_in, clock_in_start_time";

struct SpaceRow {
    id: String,
    name: String,
    description: Option<String>,
    goal: Option<String>,
    before_image: Option<String>,
    after_image: Option<String>,
    date_created: String,
    date_modified: String,
    total_clocked_in_time: u64,
    is_clocked_in: bool,
    clock_in_start_time: Option<String>,
}

impl SpaceRow {
    fn read(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            goal: row.get(3)?,
            before_image: row.get(4)?,
            after_image: row.get(5)?,
            date_created: row.get(6)?,
            date_modified: row.get(7)?,
            total_clocked_in_time: row.get(8)?,
            is_clocked_in: row.get(9)?,
            clock_in_start_time: row.get(10)?,
        })
    }

    fn decode(self) -> Result<Space> {
        const T: &str = "spaces";
        let mut space = Space {
            id: parse_id(T, &self.id)?,
            name: self.name,
            description: self.description,
            goal: self.goal,
            before_image: self.before_image,
            after_image: self.after_image,
            date_created: parse_ts(T, &self.date_created)?,
            date_modified: parse_ts(T, &self.date_modified)?,
            total_clocked_in_time: self.total_clocked_in_time,
            is_clocked_in: self.is_clocked_in,
            clock_in_start_time: parse_opt_ts(T, self.clock_in_start_time.as_deref())?,
        };
        if !space.clock_fields_consistent() {
            tracing::warn!(
                space_id = %space.id,
                is_clocked_in = space.is_clocked_in,
                "clock fields disagree; reading space as clocked out"
            );
            space.is_clocked_in = false;
            space.clock_in_start_time = None;
        }
        Ok(space)
    }
}

const LOG_COLUMNS: &str = "id, space_id, timestamp, action_name, points, kind,
     multi_step_action_id, step_index, clock_in_time, clock_out_time, minutes_clocked_in";

struct LogRow {
    id: String,
    space_id: String,
    timestamp: String,
    action_name: String,
    points: i64,
    kind: String,
    multi_step_action_id: Option<String>,
    step_index: Option<usize>,
    clock_in_time: Option<String>,
    clock_out_time: Option<String>,
    minutes_clocked_in: Option<u64>,
}

impl LogRow {
    fn read(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            space_id: row.get(1)?,
            timestamp: row.get(2)?,
            action_name: row.get(3)?,
            points: row.get(4)?,
            kind: row.get(5)?,
            multi_step_action_id: row.get(6)?,
            step_index: row.get(7)?,
            clock_in_time: row.get(8)?,
            clock_out_time: row.get(9)?,
            minutes_clocked_in: row.get(10)?,
        })
    }

    fn decode(self) -> Result<LogEntry> {
        const T: &str = "log_entries";
        let missing = |field: &str| corrupt(T, format!("{} entry without {field}", self.kind));
        let kind = LogKind::parse(&self.kind)
            .ok_or_else(|| corrupt(T, format!("unknown kind '{}'", self.kind)))?;
        let event = match kind {
            LogKind::Action => LogEvent::Action,
            LogKind::ClockIn => LogEvent::ClockIn,
            LogKind::MultiStepAction => LogEvent::MultiStepAction {
                multi_step_action_id: parse_id(
                    T,
                    self.multi_step_action_id
                        .as_deref()
                        .ok_or_else(|| missing("multi_step_action_id"))?,
                )?,
                step_index: self.step_index.ok_or_else(|| missing("step_index"))?,
            },
            LogKind::ClockOut => LogEvent::ClockOut {
                clock_in_time: parse_ts(
                    T,
                    self.clock_in_time
                        .as_deref()
                        .ok_or_else(|| missing("clock_in_time"))?,
                )?,
                clock_out_time: parse_ts(
                    T,
                    self.clock_out_time
                        .as_deref()
                        .ok_or_else(|| missing("clock_out_time"))?,
                )?,
                minutes_clocked_in: self
                    .minutes_clocked_in
                    .ok_or_else(|| missing("minutes_clocked_in"))?,
            },
        };
        Ok(LogEntry {
            id: parse_id(T, &self.id)?,
            space_id: parse_id(T, &self.space_id)?,
            timestamp: parse_ts(T, &self.timestamp)?,
            action_name: self.action_name,
            points: self.points,
            event,
        })
    }
}

/// SQLite database implementing every repository trait.
///
/// One connection, one writer. The engine's in-flight guard is what keeps
/// writes to a space from overlapping; SQLite is not asked to.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/spacetrack.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("spacetrack.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests and dry runs).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    fn write_space(&self, space: &Space) -> Result<()> {
        self.conn.execute(
            "UPDATE spaces SET
                name = ?2, description = ?3, goal = ?4, before_image = ?5, after_image = ?6,
                date_modified = ?7, total_clocked_in_time = ?8, is_clocked_in = ?9,
                clock_in_start_time = ?10
             WHERE id = ?1",
            params![
                space.id.to_string(),
                space.name,
                space.description,
                space.goal,
                space.before_image,
                space.after_image,
                format_ts(space.date_modified),
                space.total_clocked_in_time,
                space.is_clocked_in,
                space.clock_in_start_time.map(format_ts),
            ],
        )?;
        Ok(())
    }
}

impl SpaceRepository for Database {
    fn create_space(&self, new: NewSpace) -> Result<Space> {
        new.validate()?;
        let space = new.into_space(Utc::now());
        self.conn.execute(
            &format!("INSERT INTO spaces ({SPACE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
            params![
                space.id.to_string(),
                space.name,
                space.description,
                space.goal,
                space.before_image,
                space.after_image,
                format_ts(space.date_created),
                format_ts(space.date_modified),
                space.total_clocked_in_time,
                space.is_clocked_in,
                space.clock_in_start_time.map(format_ts),
            ],
        )?;
        Ok(space)
    }

    fn get_space(&self, id: Uuid) -> Result<Option<Space>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {SPACE_COLUMNS} FROM spaces WHERE id = ?1"),
                params![id.to_string()],
                SpaceRow::read,
            )
            .optional()?;
        row.map(SpaceRow::decode).transpose()
    }

    fn update_space(&self, id: Uuid, patch: &SpacePatch) -> Result<Space> {
        let mut space = self
            .get_space(id)?
            .ok_or_else(|| CoreError::not_found("Space", id))?;
        space.apply(patch, Utc::now());
        self.write_space(&space)?;
        Ok(space)
    }

    fn list_spaces(&self) -> Result<Vec<Space>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SPACE_COLUMNS} FROM spaces ORDER BY date_modified DESC"
        ))?;
        let rows = stmt.query_map([], SpaceRow::read)?;
        rows.map(|row| row.map_err(CoreError::from).and_then(SpaceRow::decode))
            .collect()
    }
}

impl LogRepository for Database {
    fn append_log(&self, entry: NewLogEntry) -> Result<LogEntry> {
        let entry = entry.into_entry(Utc::now());
        let (msa_id, step_index, clock_in, clock_out, minutes) = match entry.event {
            LogEvent::MultiStepAction {
                multi_step_action_id,
                step_index,
            } => (
                Some(multi_step_action_id.to_string()),
                Some(step_index),
                None,
                None,
                None,
            ),
            LogEvent::ClockOut {
                clock_in_time,
                clock_out_time,
                minutes_clocked_in,
            } => (
                None,
                None,
                Some(format_ts(clock_in_time)),
                Some(format_ts(clock_out_time)),
                Some(minutes_clocked_in),
            ),
            LogEvent::Action | LogEvent::ClockIn => (None, None, None, None, None),
        };
        self.conn.execute(
            &format!("INSERT INTO log_entries ({LOG_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
            params![
                entry.id.to_string(),
                entry.space_id.to_string(),
                format_ts(entry.timestamp),
                entry.action_name,
                entry.points,
                entry.kind().as_str(),
                msa_id,
                step_index,
                clock_in,
                clock_out,
                minutes,
            ],
        )?;
        Ok(entry)
    }

    fn list_logs(&self, space_id: Uuid) -> Result<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM log_entries
             WHERE space_id = ?1
             ORDER BY timestamp DESC, seq DESC"
        ))?;
        let rows = stmt.query_map(params![space_id.to_string()], LogRow::read)?;
        rows.map(|row| row.map_err(CoreError::from).and_then(LogRow::decode))
            .collect()
    }
}

fn read_action(row: &rusqlite::Row) -> rusqlite::Result<(String, String, String, u32, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn decode_action(raw: (String, String, String, u32, String)) -> Result<Action> {
    let (id, space_id, name, points, description) = raw;
    Ok(Action {
        id: parse_id("actions", &id)?,
        space_id: parse_id("actions", &space_id)?,
        name,
        points,
        description,
    })
}

type MultiStepRaw = (String, String, String, u32, String, usize);

fn read_multi_step(row: &rusqlite::Row) -> rusqlite::Result<MultiStepRaw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn decode_multi_step(raw: MultiStepRaw) -> Result<MultiStepAction> {
    const T: &str = "multi_step_actions";
    let (id, space_id, name, points_per_step, steps, current_step_index) = raw;
    let steps: Vec<ActionStep> = serde_json::from_str(&steps).map_err(|e| corrupt(T, e))?;
    let action = MultiStepAction {
        id: parse_id(T, &id)?,
        space_id: parse_id(T, &space_id)?,
        name,
        points_per_step,
        steps,
        current_step_index,
    };
    if !action.is_consistent() {
        return Err(corrupt(
            T,
            format!("step flags disagree with index {current_step_index}"),
        ));
    }
    Ok(action)
}

impl CatalogRepository for Database {
    fn create_action(&self, new: NewAction) -> Result<Action> {
        new.validate()?;
        let action = new.into_action();
        self.conn.execute(
            "INSERT INTO actions (id, space_id, name, points, description)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                action.id.to_string(),
                action.space_id.to_string(),
                action.name,
                action.points,
                action.description,
            ],
        )?;
        Ok(action)
    }

    fn get_action(&self, id: Uuid) -> Result<Option<Action>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, space_id, name, points, description FROM actions WHERE id = ?1",
                params![id.to_string()],
                read_action,
            )
            .optional()?;
        raw.map(decode_action).transpose()
    }

    fn list_actions(&self, space_id: Uuid) -> Result<Vec<Action>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, space_id, name, points, description FROM actions
             WHERE space_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![space_id.to_string()], read_action)?;
        rows.map(|row| row.map_err(CoreError::from).and_then(decode_action))
            .collect()
    }

    fn create_multi_step_action(&self, new: NewMultiStepAction) -> Result<MultiStepAction> {
        new.validate()?;
        let action = new.into_action();
        self.conn.execute(
            "INSERT INTO multi_step_actions
                (id, space_id, name, points_per_step, steps, current_step_index)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                action.id.to_string(),
                action.space_id.to_string(),
                action.name,
                action.points_per_step,
                serde_json::to_string(&action.steps)?,
                action.current_step_index,
            ],
        )?;
        Ok(action)
    }

    fn get_multi_step_action(&self, id: Uuid) -> Result<Option<MultiStepAction>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, space_id, name, points_per_step, steps, current_step_index
                 FROM multi_step_actions WHERE id = ?1",
                params![id.to_string()],
                read_multi_step,
            )
            .optional()?;
        raw.map(decode_multi_step).transpose()
    }

    fn list_multi_step_actions(&self, space_id: Uuid) -> Result<Vec<MultiStepAction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, space_id, name, points_per_step, steps, current_step_index
             FROM multi_step_actions WHERE space_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![space_id.to_string()], read_multi_step)?;
        rows.map(|row| row.map_err(CoreError::from).and_then(decode_multi_step))
            .collect()
    }

    fn save_step_progress(&self, action: &MultiStepAction) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE multi_step_actions SET steps = ?2, current_step_index = ?3 WHERE id = ?1",
            params![
                action.id.to_string(),
                serde_json::to_string(&action.steps)?,
                action.current_step_index,
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found("MultiStepAction", action.id));
        }
        Ok(())
    }
}

impl WasteRepository for Database {
    fn add_waste(&self, new: NewWasteEntry) -> Result<WasteEntry> {
        new.validate()?;
        let entry = new.into_entry(Utc::now());
        self.conn.execute(
            "INSERT INTO waste_entries (id, space_id, timestamp, category, points)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.id.to_string(),
                entry.space_id.to_string(),
                format_ts(entry.timestamp),
                entry.category,
                entry.points,
            ],
        )?;
        Ok(entry)
    }

    fn list_waste(&self, space_id: Uuid) -> Result<Vec<WasteEntry>> {
        const T: &str = "waste_entries";
        let mut stmt = self.conn.prepare(
            "SELECT id, space_id, timestamp, category, points FROM waste_entries
             WHERE space_id = ?1 ORDER BY timestamp DESC, seq DESC",
        )?;
        let rows = stmt.query_map(params![space_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, u32>(4)?,
            ))
        })?;
        rows.map(|row| -> Result<WasteEntry> {
            let (id, space_id, timestamp, category, points) = row?;
            Ok(WasteEntry {
                id: parse_id(T, &id)?,
                space_id: parse_id(T, &space_id)?,
                timestamp: parse_ts(T, &timestamp)?,
                category,
                points,
            })
        })
        .collect()
    }
}

type TodoRaw = (String, String, String, bool, String, Option<String>);

fn read_todo(row: &rusqlite::Row) -> rusqlite::Result<TodoRaw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn decode_todo(raw: TodoRaw) -> Result<Todo> {
    const T: &str = "todos";
    let (id, space_id, text, completed, created_at, completed_at) = raw;
    Ok(Todo {
        id: parse_id(T, &id)?,
        space_id: parse_id(T, &space_id)?,
        text,
        completed,
        created_at: parse_ts(T, &created_at)?,
        completed_at: parse_opt_ts(T, completed_at.as_deref())?,
    })
}

impl NoteRepository for Database {
    fn add_todo(&self, new: NewTodo) -> Result<Todo> {
        new.validate()?;
        let todo = new.into_todo(Utc::now());
        self.conn.execute(
            "INSERT INTO todos (id, space_id, text, completed, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                todo.id.to_string(),
                todo.space_id.to_string(),
                todo.text,
                todo.completed,
                format_ts(todo.created_at),
                todo.completed_at.map(format_ts),
            ],
        )?;
        Ok(todo)
    }

    fn get_todo(&self, id: Uuid) -> Result<Option<Todo>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, space_id, text, completed, created_at, completed_at
                 FROM todos WHERE id = ?1",
                params![id.to_string()],
                read_todo,
            )
            .optional()?;
        raw.map(decode_todo).transpose()
    }

    fn save_todo(&self, todo: &Todo) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE todos SET text = ?2, completed = ?3, completed_at = ?4 WHERE id = ?1",
            params![
                todo.id.to_string(),
                todo.text,
                todo.completed,
                todo.completed_at.map(format_ts),
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found("Todo", todo.id));
        }
        Ok(())
    }

    fn list_todos(&self, space_id: Uuid) -> Result<Vec<Todo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, space_id, text, completed, created_at, completed_at
             FROM todos WHERE space_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![space_id.to_string()], read_todo)?;
        rows.map(|row| row.map_err(CoreError::from).and_then(decode_todo))
            .collect()
    }

    fn add_comment(&self, new: NewComment) -> Result<Comment> {
        new.validate()?;
        let comment = new.into_comment(Utc::now());
        self.conn.execute(
            "INSERT INTO comments (id, space_id, text, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![
                comment.id.to_string(),
                comment.space_id.to_string(),
                comment.text,
                format_ts(comment.timestamp),
            ],
        )?;
        Ok(comment)
    }

    fn list_comments(&self, space_id: Uuid) -> Result<Vec<Comment>> {
        const T: &str = "comments";
        let mut stmt = self.conn.prepare(
            "SELECT id, space_id, text, timestamp FROM comments
             WHERE space_id = ?1 ORDER BY timestamp DESC, seq DESC",
        )?;
        let rows = stmt.query_map(params![space_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        rows.map(|row| -> Result<Comment> {
            let (id, space_id, text, timestamp) = row?;
            Ok(Comment {
                id: parse_id(T, &id)?,
                space_id: parse_id(T, &space_id)?,
                text,
                timestamp: parse_ts(T, &timestamp)?,
            })
        })
        .collect()
    }
}
