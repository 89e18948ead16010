//! SQLite run store.
//!
//! Tables mirror the upload → run → suggestion hierarchy; metrics are kept
//! as a JSON document per run.

use crate::domain::error::CoachError;
use crate::domain::metrics::MetricsRecord;
use crate::domain::suggestion::Suggestion;
use crate::ports::config_port::ConfigPort;
use crate::ports::run_store_port::{RunStore, RunSummary, StoredRun};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS uploads (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        filename TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS backtest_runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        upload_id INTEGER NOT NULL REFERENCES uploads(id),
        metrics TEXT NOT NULL,
        equity_curve_path TEXT,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS suggestions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        backtest_run_id INTEGER NOT NULL REFERENCES backtest_runs(id),
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        risk_note TEXT,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_runs_upload ON backtest_runs(upload_id);
    CREATE INDEX IF NOT EXISTS idx_suggestions_run ON suggestions(backtest_run_id);";

pub struct SqliteRunStore {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(e: r2d2::Error) -> CoachError {
    CoachError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> CoachError {
    CoachError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn decode_metrics(json: &str) -> Result<MetricsRecord, CoachError> {
    serde_json::from_str(json).map_err(|e| CoachError::DatabaseQuery {
        reason: format!("corrupt metrics document: {e}"),
    })
}

impl SqliteRunStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, CoachError> {
        let db_path =
            config
                .get_trimmed("sqlite", "path")
                .ok_or_else(|| CoachError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, CoachError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, CoachError> {
        self.pool.get().map_err(db_err)
    }

    pub fn initialize_schema(&self) -> Result<(), CoachError> {
        self.conn()?.execute_batch(SCHEMA).map_err(query_err)
    }

    fn load_suggestions(
        conn: &rusqlite::Connection,
        run_id: i64,
    ) -> Result<Vec<Suggestion>, CoachError> {
        let mut stmt = conn
            .prepare(
                "SELECT title, description, risk_note FROM suggestions
                 WHERE backtest_run_id = ?1 ORDER BY id ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(Suggestion {
                    title: row.get(0)?,
                    description: row.get(1)?,
                    risk_note: row.get(2)?,
                })
            })
            .map_err(query_err)?;

        let suggestions = rows.collect::<Result<Vec<_>, _>>().map_err(query_err)?;
        Ok(suggestions)
    }
}

impl RunStore for SqliteRunStore {
    fn create_upload(&self, filename: &str) -> Result<i64, CoachError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO uploads (filename, created_at) VALUES (?1, ?2)",
            params![filename, now()],
        )
        .map_err(query_err)?;
        Ok(conn.last_insert_rowid())
    }

    fn record_run(
        &self,
        upload_id: i64,
        metrics: &MetricsRecord,
        equity_curve_path: Option<&str>,
    ) -> Result<i64, CoachError> {
        let metrics_json = serde_json::to_string(metrics).map_err(|e| CoachError::DatabaseQuery {
            reason: format!("failed to encode metrics: {e}"),
        })?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO backtest_runs (upload_id, metrics, equity_curve_path, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![upload_id, metrics_json, equity_curve_path, now()],
        )
        .map_err(query_err)?;
        Ok(conn.last_insert_rowid())
    }

    fn record_suggestions(&self, run_id: i64, suggestions: &[Suggestion]) -> Result<(), CoachError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        let created_at = now();

        for s in suggestions {
            tx.execute(
                "INSERT INTO suggestions (backtest_run_id, title, description, risk_note, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![run_id, s.title, s.description, s.risk_note, created_at],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)
    }

    fn get_run(&self, run_id: i64) -> Result<Option<StoredRun>, CoachError> {
        let conn = self.conn()?;

        let row: Option<(i64, i64, String, String, Option<String>, String)> = conn
            .query_row(
                "SELECT r.id, r.upload_id, u.filename, r.metrics, r.equity_curve_path, r.created_at
                 FROM backtest_runs r JOIN uploads u ON u.id = r.upload_id
                 WHERE r.id = ?1",
                params![run_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .optional()
            .map_err(query_err)?;

        let Some((id, upload_id, filename, metrics_json, equity_curve_path, created_at)) = row else {
            return Ok(None);
        };

        Ok(Some(StoredRun {
            id,
            upload_id,
            filename,
            metrics: decode_metrics(&metrics_json)?,
            equity_curve_path,
            created_at,
            suggestions: Self::load_suggestions(&conn, id)?,
        }))
    }

    fn list_runs(&self, limit: usize) -> Result<Vec<RunSummary>, CoachError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT r.id, u.filename, r.metrics, r.created_at
                 FROM backtest_runs r JOIN uploads u ON u.id = r.upload_id
                 ORDER BY r.id DESC LIMIT ?1",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(query_err)?;

        let mut runs = Vec::new();
        for row in rows {
            let (id, filename, metrics_json, created_at) = row.map_err(query_err)?;
            runs.push(RunSummary {
                id,
                filename,
                metrics: decode_metrics(&metrics_json)?,
                created_at,
            });
        }
        Ok(runs)
    }
}
