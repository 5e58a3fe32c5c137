use crate::error::{Result, TrackerError};
use crate::store::{Sample, TrackedGame};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::info;

pub struct DbClient {
    db_path: String,
    conn: Mutex<Connection>,
}

impl DbClient {
    pub fn new(db_path: String) -> Result<Self> {
        let conn = Connection::open(&db_path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self {
            db_path,
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| TrackerError::LockPoisoned)
    }

    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS games (
                app_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                last_updated INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS player_counts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                app_id INTEGER NOT NULL REFERENCES games(app_id),
                player_count INTEGER NOT NULL,
                recorded_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_player_counts_app_recorded
                ON player_counts(app_id, recorded_at)",
            [],
        )?;

        info!("SQLite database initialized at {}", self.db_path);
        Ok(())
    }

    pub fn game_exists(&self, app_id: u64) -> Result<bool> {
        let conn = self.conn()?;
        let exists = conn
            .prepare_cached("SELECT EXISTS(SELECT 1 FROM games WHERE app_id = ?1)")?
            .query_row([app_id as i64], |r| r.get::<_, bool>(0))?;
        Ok(exists)
    }

    pub fn get_game(&self, app_id: u64) -> Result<Option<TrackedGame>> {
        let conn = self.conn()?;
        let game = conn
            .prepare_cached(
                "SELECT app_id, name, created_at, last_updated FROM games WHERE app_id = ?1",
            )?
            .query_row([app_id as i64], row_to_game)
            .optional()?;
        Ok(game)
    }

    pub fn insert_game(&self, app_id: u64, name: &str, now: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn()?;
        let ts = now.timestamp_millis();
        let inserted = conn
            .prepare_cached(
                "INSERT OR IGNORE INTO games (app_id, name, created_at, last_updated)
                 VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![app_id as i64, name, ts, ts])?;
        Ok(inserted > 0)
    }

    pub fn list_games(&self) -> Result<Vec<TrackedGame>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT app_id, name, created_at, last_updated FROM games ORDER BY app_id",
        )?;
        let games = stmt
            .query_map([], row_to_game)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(games)
    }

    pub fn find_games_by_name(&self, term: &str) -> Result<Vec<TrackedGame>> {
        let conn = self.conn()?;
        // instr() instead of LIKE so '%' and '_' in the term stay literal
        let mut stmt = conn.prepare_cached(
            "SELECT app_id, name, created_at, last_updated FROM games
             WHERE instr(lower(name), lower(?1)) > 0
             ORDER BY app_id",
        )?;
        let games = stmt
            .query_map([term], row_to_game)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(games)
    }

    pub fn insert_sample(
        &self,
        app_id: u64,
        player_count: u64,
        recorded_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let ts = recorded_at.timestamp_millis();
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE games SET last_updated = MAX(last_updated, ?2) WHERE app_id = ?1",
            params![app_id as i64, ts],
        )?;
        if updated == 0 {
            return Err(TrackerError::NotFound(app_id));
        }

        tx.execute(
            "INSERT INTO player_counts (app_id, player_count, recorded_at) VALUES (?1, ?2, ?3)",
            params![app_id as i64, player_count as i64, ts],
        )?;

        tx.commit()?;
        Ok(())
    }

    pub fn samples_since(&self, app_id: u64, cutoff: DateTime<Utc>) -> Result<Vec<Sample>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT player_count, recorded_at FROM player_counts
             WHERE app_id = ?1 AND recorded_at >= ?2
             ORDER BY recorded_at ASC, id ASC",
        )?;
        let samples = stmt
            .query_map(params![app_id as i64, cutoff.timestamp_millis()], |row| {
                Ok(Sample {
                    app_id,
                    player_count: row.get::<_, i64>(0)? as u64,
                    recorded_at: millis_to_datetime(row.get(1)?, 1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(samples)
    }

    pub fn count_samples(&self, app_id: u64) -> Result<u64> {
        let conn = self.conn()?;
        let count = conn
            .prepare_cached("SELECT COUNT(*) FROM player_counts WHERE app_id = ?1")?
            .query_row([app_id as i64], |r| r.get::<_, i64>(0))?;
        Ok(count as u64)
    }

    pub fn delete_game(&self, app_id: u64) -> Result<u64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM games WHERE app_id = ?1)",
            [app_id as i64],
            |r| r.get(0),
        )?;
        if !exists {
            return Err(TrackerError::NotFound(app_id));
        }

        let removed = tx.execute(
            "DELETE FROM player_counts WHERE app_id = ?1",
            [app_id as i64],
        )?;
        tx.execute("DELETE FROM games WHERE app_id = ?1", [app_id as i64])?;

        tx.commit()?;
        Ok(removed as u64)
    }
}

fn row_to_game(row: &Row<'_>) -> rusqlite::Result<TrackedGame> {
    Ok(TrackedGame {
        app_id: row.get::<_, i64>(0)? as u64,
        name: row.get(1)?,
        created_at: millis_to_datetime(row.get(2)?, 2)?,
        last_updated: millis_to_datetime(row.get(3)?, 3)?,
    })
}

fn millis_to_datetime(ms: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(column, ms))
}
