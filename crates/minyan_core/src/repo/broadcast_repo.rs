//! Broadcast repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/get/update/delete/list over the `broadcasts` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Broadcast::validate()` before SQL mutations.
//! - `update_broadcast` loads, merges, validates and writes inside one
//!   `BEGIN IMMEDIATE` transaction, so writers to one id never interleave.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::{current_version, latest_version};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::broadcast::{Broadcast, BroadcastId, BroadcastPatch, MinyanType, NewBroadcast};
use crate::model::validate::{validate_type, ValidationError};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const BROADCAST_SELECT_SQL: &str = "SELECT
    id,
    latitude,
    longitude,
    minyan_type,
    earliest_time,
    latest_time,
    active,
    created_at
FROM broadcasts";

const REQUIRED_COLUMNS: [&str; 8] = [
    "id",
    "latitude",
    "longitude",
    "minyan_type",
    "earliest_time",
    "latest_time",
    "active",
    "created_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for broadcast persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound(BroadcastId),
    InvalidData(String),
    /// Connection was not bootstrapped through `db::open_db*`.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Another thread panicked while holding the connection.
    LockPoisoned,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "broadcast not found: {id}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted broadcast data: {message}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
            Self::LockPoisoned => write!(f, "broadcast store connection lock is poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Inclusive latitude band in degrees used to narrow candidate rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatitudeBand {
    pub min: f64,
    pub max: f64,
}

/// Filter options for listing broadcasts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BroadcastFilter {
    pub active_only: bool,
    pub minyan_type: Option<MinyanType>,
    pub latitude_band: Option<LatitudeBand>,
}

/// Repository interface for broadcast storage.
pub trait BroadcastRepository {
    /// Persists a new active broadcast and returns the stored record.
    fn create_broadcast(&self, fields: &NewBroadcast) -> RepoResult<Broadcast>;
    fn get_broadcast(&self, id: BroadcastId) -> RepoResult<Broadcast>;
    /// Merges `patch` onto the stored record and returns the merged result.
    fn update_broadcast(&self, id: BroadcastId, patch: &BroadcastPatch) -> RepoResult<Broadcast>;
    /// Hard-deletes one broadcast. Deleting a missing id is `NotFound`.
    fn delete_broadcast(&self, id: BroadcastId) -> RepoResult<()>;
    fn list_broadcasts(&self, filter: &BroadcastFilter) -> RepoResult<Vec<Broadcast>>;
}

impl<R: BroadcastRepository + ?Sized> BroadcastRepository for &R {
    fn create_broadcast(&self, fields: &NewBroadcast) -> RepoResult<Broadcast> {
        (**self).create_broadcast(fields)
    }

    fn get_broadcast(&self, id: BroadcastId) -> RepoResult<Broadcast> {
        (**self).get_broadcast(id)
    }

    fn update_broadcast(&self, id: BroadcastId, patch: &BroadcastPatch) -> RepoResult<Broadcast> {
        (**self).update_broadcast(id, patch)
    }

    fn delete_broadcast(&self, id: BroadcastId) -> RepoResult<()> {
        (**self).delete_broadcast(id)
    }

    fn list_broadcasts(&self, filter: &BroadcastFilter) -> RepoResult<Vec<Broadcast>> {
        (**self).list_broadcasts(filter)
    }
}

impl<R: BroadcastRepository + ?Sized> BroadcastRepository for Arc<R> {
    fn create_broadcast(&self, fields: &NewBroadcast) -> RepoResult<Broadcast> {
        (**self).create_broadcast(fields)
    }

    fn get_broadcast(&self, id: BroadcastId) -> RepoResult<Broadcast> {
        (**self).get_broadcast(id)
    }

    fn update_broadcast(&self, id: BroadcastId, patch: &BroadcastPatch) -> RepoResult<Broadcast> {
        (**self).update_broadcast(id, patch)
    }

    fn delete_broadcast(&self, id: BroadcastId) -> RepoResult<()> {
        (**self).delete_broadcast(id)
    }

    fn list_broadcasts(&self, filter: &BroadcastFilter) -> RepoResult<Vec<Broadcast>> {
        (**self).list_broadcasts(filter)
    }
}

/// SQLite-backed broadcast repository.
///
/// Owns its connection behind a mutex so one handle can be shared across
/// threads (wrap it in `Arc`).
pub struct SqliteBroadcastRepository {
    conn: Mutex<Connection>,
}

impl SqliteBroadcastRepository {
    /// Wraps a connection that was bootstrapped by `db::open_db*`.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens (or creates) a database file and wraps it.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::LockPoisoned)
    }
}

impl BroadcastRepository for SqliteBroadcastRepository {
    fn create_broadcast(&self, fields: &NewBroadcast) -> RepoResult<Broadcast> {
        let broadcast = Broadcast::new(fields.clone());
        broadcast.validate()?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO broadcasts (
                id,
                latitude,
                longitude,
                minyan_type,
                earliest_time,
                latest_time,
                active,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                broadcast.id.to_string(),
                broadcast.latitude,
                broadcast.longitude,
                broadcast.minyan_type.as_str(),
                time_to_db(&broadcast.earliest_time),
                time_to_db(&broadcast.latest_time),
                bool_to_int(broadcast.active),
                time_to_db(&broadcast.created_at),
            ],
        )?;

        Ok(broadcast)
    }

    fn get_broadcast(&self, id: BroadcastId) -> RepoResult<Broadcast> {
        let conn = self.lock()?;
        load_broadcast(&conn, id)?.ok_or(RepoError::NotFound(id))
    }

    fn update_broadcast(&self, id: BroadcastId, patch: &BroadcastPatch) -> RepoResult<Broadcast> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut broadcast = load_broadcast(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        broadcast.apply(patch);
        broadcast.validate()?;

        write_broadcast_in_tx(&tx, &broadcast)?;
        tx.commit()?;

        Ok(broadcast)
    }

    fn delete_broadcast(&self, id: BroadcastId) -> RepoResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM broadcasts WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn list_broadcasts(&self, filter: &BroadcastFilter) -> RepoResult<Vec<Broadcast>> {
        let mut sql = format!("{BROADCAST_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if filter.active_only {
            sql.push_str(" AND active = 1");
        }

        if let Some(minyan_type) = filter.minyan_type {
            sql.push_str(" AND minyan_type = ?");
            bind_values.push(Value::Text(minyan_type.as_str().to_string()));
        }

        if let Some(band) = filter.latitude_band {
            sql.push_str(" AND latitude BETWEEN ? AND ?");
            bind_values.push(Value::Real(band.min));
            bind_values.push(Value::Real(band.max));
        }

        sql.push_str(" ORDER BY created_at ASC, id ASC");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut broadcasts = Vec::new();

        while let Some(row) = rows.next()? {
            broadcasts.push(parse_broadcast_row(row)?);
        }

        Ok(broadcasts)
    }
}

fn load_broadcast(conn: &Connection, id: BroadcastId) -> RepoResult<Option<Broadcast>> {
    let mut stmt = conn.prepare(&format!("{BROADCAST_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_broadcast_row(row)?));
    }

    Ok(None)
}

fn write_broadcast_in_tx(tx: &Transaction<'_>, broadcast: &Broadcast) -> RepoResult<()> {
    tx.execute(
        "UPDATE broadcasts
         SET
            latitude = ?1,
            longitude = ?2,
            minyan_type = ?3,
            earliest_time = ?4,
            latest_time = ?5,
            active = ?6
         WHERE id = ?7;",
        params![
            broadcast.latitude,
            broadcast.longitude,
            broadcast.minyan_type.as_str(),
            time_to_db(&broadcast.earliest_time),
            time_to_db(&broadcast.latest_time),
            bool_to_int(broadcast.active),
            broadcast.id.to_string(),
        ],
    )?;
    Ok(())
}

fn parse_broadcast_row(row: &Row<'_>) -> RepoResult<Broadcast> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in broadcasts.id"))
    })?;

    let type_text: String = row.get("minyan_type")?;
    let minyan_type = validate_type(&type_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid minyan type `{type_text}` in broadcasts.minyan_type"
        ))
    })?;

    let active = match row.get::<_, i64>("active")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid active value `{other}` in broadcasts.active"
            )));
        }
    };

    let broadcast = Broadcast {
        id,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        minyan_type,
        earliest_time: parse_time(row, "earliest_time")?,
        latest_time: parse_time(row, "latest_time")?,
        active,
        created_at: parse_time(row, "created_at")?,
    };
    broadcast
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("broadcast {id}: {err}")))?;
    Ok(broadcast)
}

fn parse_time(row: &Row<'_>, column: &'static str) -> RepoResult<DateTime<Utc>> {
    let text: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|_| {
            RepoError::InvalidData(format!("invalid timestamp `{text}` in broadcasts.{column}"))
        })
}

/// Fixed-width text keeps SQL comparisons chronological.
fn time_to_db(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "broadcasts")? {
        return Err(RepoError::MissingRequiredTable("broadcasts"));
    }

    for column in REQUIRED_COLUMNS {
        if !table_has_column(conn, "broadcasts", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "broadcasts",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [table],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(exists.is_some())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
