//! SQLite state store for live sessions.
//!
//! Positions are stored as JSON, one row per symbol. Leverage entries get a
//! row per `(symbol, side)`. Each save replaces the whole table inside one
//! transaction.

use crate::domain::error::TraderError;
use crate::domain::leverage_cache::LeverageEntry;
use crate::domain::position::{Position, Side};
use crate::ports::config_port::ConfigPort;
use crate::ports::state_port::StateStore;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

fn db_err(e: impl std::fmt::Display) -> TraderError {
    TraderError::Persistence {
        reason: e.to_string(),
    }
}

pub struct SqliteStateStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStateStore {
    /// Opens the database named by `[state] path`.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TraderError> {
        let db_path = config
            .get_string("state", "path")
            .ok_or_else(|| TraderError::missing("state", "path"))?;

        let pool_size = match config.get_string("state", "pool_size") {
            None => 4,
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| TraderError::invalid("state", "pool_size", "must be a positive integer"))?,
        };

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, TraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, TraderError> {
        self.pool.get().map_err(db_err)
    }

    fn initialize_schema(&self) -> Result<(), TraderError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS positions (
                    symbol TEXT PRIMARY KEY,
                    body TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS leverage_cache (
                    symbol TEXT NOT NULL,
                    side TEXT NOT NULL,
                    leverage INTEGER NOT NULL,
                    timestamp_ms INTEGER NOT NULL,
                    failed INTEGER NOT NULL,
                    error_code INTEGER,
                    PRIMARY KEY (symbol, side)
                );",
            )
            .map_err(db_err)
    }
}

impl StateStore for SqliteStateStore {
    fn save_positions(&self, positions: &[Position]) -> Result<(), TraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;
        tx.execute("DELETE FROM positions", []).map_err(db_err)?;
        for position in positions {
            let body = serde_json::to_string(position).map_err(db_err)?;
            tx.execute(
                "INSERT OR REPLACE INTO positions (symbol, body) VALUES (?1, ?2)",
                params![position.symbol, body],
            )
            .map_err(db_err)?;
        }
        tx.commit().map_err(db_err)
    }

    fn load_positions(&self) -> Result<Vec<Position>, TraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT body FROM positions ORDER BY symbol ASC")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(db_err)?;

        let mut positions = Vec::new();
        for row in rows {
            let body = row.map_err(db_err)?;
            positions.push(serde_json::from_str(&body).map_err(db_err)?);
        }
        Ok(positions)
    }

    fn save_leverage_cache(&self, entries: &[LeverageEntry]) -> Result<(), TraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;
        tx.execute("DELETE FROM leverage_cache", []).map_err(db_err)?;
        for entry in entries {
            tx.execute(
                "INSERT OR REPLACE INTO leverage_cache
                     (symbol, side, leverage, timestamp_ms, failed, error_code)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.symbol,
                    entry.side.as_str(),
                    entry.leverage,
                    entry.timestamp_ms,
                    entry.failed,
                    entry.error_code
                ],
            )
            .map_err(db_err)?;
        }
        tx.commit().map_err(db_err)
    }

    fn load_leverage_cache(&self) -> Result<Vec<LeverageEntry>, TraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, side, leverage, timestamp_ms, failed, error_code
                 FROM leverage_cache ORDER BY symbol ASC, side ASC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, Option<i64>>(5)?,
                ))
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            let (symbol, side, leverage, timestamp_ms, failed, error_code) = row.map_err(db_err)?;
            let side = Side::parse(&side)
                .ok_or_else(|| db_err(format!("unknown side '{side}' for {symbol}")))?;
            entries.push(LeverageEntry {
                symbol,
                side,
                leverage,
                timestamp_ms,
                failed,
                error_code,
            });
        }
        Ok(entries)
    }
}
