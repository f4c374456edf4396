use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::{Store, StoreError};
use crate::entities::{Behavior, Child, Location};
use crate::geo::Coordinates;

/// SQLite-backed store.
///
/// Name uniqueness comes from `UNIQUE` columns and the good-child counter is
/// bumped with `SET good_child_count = good_child_count + 1` inside the same
/// transaction as the child insert. The single connection sits behind a
/// mutex, which makes this store the serialization point for writers.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`. `:memory:` opens a private
    /// in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!("Opened database at {}", path.display());

        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        setup_database(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("database connection lock poisoned".to_string()))
    }
}

pub fn setup_database(conn: &Connection) -> Result<(), StoreError> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // seq keeps insertion order for listings
    conn.execute(
        "CREATE TABLE IF NOT EXISTS locations (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            name TEXT UNIQUE NOT NULL,
            lat REAL NOT NULL,
            lon REAL NOT NULL,
            good_child_count INTEGER NOT NULL DEFAULT 0 CHECK (good_child_count >= 0),
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS children (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            name TEXT UNIQUE NOT NULL,
            behavior TEXT NOT NULL CHECK (behavior IN ('good', 'bad')),
            location_id TEXT NOT NULL REFERENCES locations(id),
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_children_behavior ON children(behavior)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_children_location ON children(location_id)",
        [],
    )?;

    Ok(())
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                StoreError::ConstraintViolation(msg.clone().unwrap_or_else(|| err.to_string()))
            }
            rusqlite::Error::SqliteFailure(e, msg)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                StoreError::MissingReference(msg.clone().unwrap_or_else(|| err.to_string()))
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

const LOCATION_COLUMNS: &str = "id, name, lat, lon, good_child_count, created_at";
const CHILD_COLUMNS: &str = "id, name, behavior, location_id, created_at";

fn location_from_row(row: &Row<'_>) -> rusqlite::Result<Location> {
    let created_at: String = row.get(5)?;
    let count: i64 = row.get(4)?;

    Ok(Location {
        id: row.get(0)?,
        name: row.get(1)?,
        coordinates: Coordinates::new(row.get(2)?, row.get(3)?),
        good_child_count: count.max(0) as u64,
        created_at: parse_timestamp(5, &created_at)?,
    })
}

fn child_from_row(row: &Row<'_>) -> rusqlite::Result<Child> {
    let behavior: String = row.get(2)?;
    let created_at: String = row.get(4)?;

    Ok(Child {
        id: row.get(0)?,
        name: row.get(1)?,
        behavior: behavior.parse::<Behavior>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        location_id: row.get(3)?,
        created_at: parse_timestamp(4, &created_at)?,
    })
}

impl Store for SqliteStore {
    fn find_location(&self, id: &str) -> Result<Option<Location>, StoreError> {
        let conn = self.conn()?;
        let location = conn
            .query_row(
                &format!("SELECT {} FROM locations WHERE id = ?1", LOCATION_COLUMNS),
                [id],
                location_from_row,
            )
            .optional()?;

        Ok(location)
    }

    fn insert_location(&self, location: &Location) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO locations (id, name, lat, lon, good_child_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                location.id,
                location.name,
                location.coordinates.lat,
                location.coordinates.lon,
                location.good_child_count as i64,
                location.created_at.to_rfc3339(),
            ],
        )?;

        debug!("Inserted location {} ({})", location.name, location.id);
        Ok(())
    }

    fn insert_child(&self, child: &Child) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        // Dropping the transaction without commit rolls it back
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO children (id, name, behavior, location_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                child.id,
                child.name,
                child.behavior.as_str(),
                child.location_id,
                child.created_at.to_rfc3339(),
            ],
        )?;

        if child.behavior.is_good() {
            let updated = tx.execute(
                "UPDATE locations SET good_child_count = good_child_count + 1 WHERE id = ?1",
                [&child.location_id],
            )?;

            if updated == 0 {
                return Err(StoreError::MissingReference(child.location_id.clone()));
            }
        }

        tx.commit()?;

        debug!(
            "Inserted {} child {} at location {}",
            child.behavior, child.name, child.location_id
        );
        Ok(())
    }

    fn find_locations(&self) -> Result<Vec<Location>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM locations ORDER BY seq",
            LOCATION_COLUMNS
        ))?;

        let locations = stmt
            .query_map([], location_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(locations)
    }

    fn find_children(&self, behavior: Option<Behavior>) -> Result<Vec<Child>, StoreError> {
        let conn = self.conn()?;

        let children = match behavior {
            Some(behavior) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM children WHERE behavior = ?1 ORDER BY seq",
                    CHILD_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([behavior.as_str()], child_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM children ORDER BY seq",
                    CHILD_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], child_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(children)
    }
}
