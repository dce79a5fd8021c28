//! Bounded crawl history
//!
//! Every completed run appends its crawl results to a history store. Stores
//! keep at most `capacity` results, evicting the oldest first, and count runs
//! separately so status reporting survives eviction.

use crate::crawler::CrawlResult;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::VecDeque;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while recording or reading history
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid timestamp in history: {0}")]
    Timestamp(String),
}

/// Result type for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Storage for the results of past runs
pub trait HistoryStore: Send {
    /// Appends one run's results, evicting the oldest results beyond capacity
    ///
    /// # Arguments
    ///
    /// * `started_at` - When the run began
    /// * `results` - Every crawl result the run produced, in phase order
    fn record_run(&mut self, started_at: DateTime<Utc>, results: &[CrawlResult]) -> HistoryResult<()>;

    /// Retained results, oldest first
    fn results(&self) -> HistoryResult<Vec<CrawlResult>>;

    /// Number of runs ever recorded
    fn run_count(&self) -> HistoryResult<u64>;

    /// Start time of the most recent run
    fn last_run(&self) -> HistoryResult<Option<DateTime<Utc>>>;
}

/// In-process ring buffer
#[derive(Debug)]
pub struct MemoryHistory {
    capacity: usize,
    results: VecDeque<CrawlResult>,
    runs: u64,
    last_run: Option<DateTime<Utc>>,
}

impl MemoryHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            results: VecDeque::with_capacity(capacity.min(1024)),
            runs: 0,
            last_run: None,
        }
    }
}

impl HistoryStore for MemoryHistory {
    fn record_run(&mut self, started_at: DateTime<Utc>, results: &[CrawlResult]) -> HistoryResult<()> {
        for result in results {
            if self.results.len() == self.capacity {
                self.results.pop_front();
            }
            self.results.push_back(result.clone());
        }
        self.runs += 1;
        self.last_run = Some(started_at);
        Ok(())
    }

    fn results(&self) -> HistoryResult<Vec<CrawlResult>> {
        Ok(self.results.iter().cloned().collect())
    }

    fn run_count(&self) -> HistoryResult<u64> {
        Ok(self.runs)
    }

    fn last_run(&self) -> HistoryResult<Option<DateTime<Utc>>> {
        Ok(self.last_run)
    }
}

const HISTORY_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    result_count INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    source TEXT NOT NULL,
    payload TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_results_run ON results(run_id);

CREATE TABLE IF NOT EXISTS run_totals (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    total INTEGER NOT NULL
);

INSERT OR IGNORE INTO run_totals (id, total) VALUES (1, 0);
"#;

/// SQLite-backed history that survives restarts
pub struct SqliteHistory {
    conn: Connection,
    capacity: usize,
}

impl SqliteHistory {
    /// Opens or creates a history database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `capacity` - Maximum number of results retained
    pub fn open(path: &Path, capacity: usize) -> HistoryResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        conn.execute_batch(HISTORY_SCHEMA)?;

        Ok(Self {
            conn,
            capacity: capacity.max(1),
        })
    }

    /// Creates an in-memory database
    pub fn in_memory(capacity: usize) -> HistoryResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(HISTORY_SCHEMA)?;
        Ok(Self {
            conn,
            capacity: capacity.max(1),
        })
    }
}

impl HistoryStore for SqliteHistory {
    fn record_run(&mut self, started_at: DateTime<Utc>, results: &[CrawlResult]) -> HistoryResult<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO runs (started_at, result_count) VALUES (?1, ?2)",
            params![started_at.to_rfc3339(), results.len() as i64],
        )?;
        let run_id = tx.last_insert_rowid();

        for result in results {
            let payload = serde_json::to_string(result)?;
            tx.execute(
                "INSERT INTO results (run_id, source, payload) VALUES (?1, ?2, ?3)",
                params![run_id, result.source, payload],
            )?;
        }

        // Keep only the newest `capacity` results
        tx.execute(
            "DELETE FROM results WHERE id NOT IN (SELECT id FROM results ORDER BY id DESC LIMIT ?1)",
            params![self.capacity as i64],
        )?;
        // Runs without retained results are dropped; the latest run stays for `last_run`
        tx.execute(
            "DELETE FROM runs WHERE id <> ?1 AND id NOT IN (SELECT DISTINCT run_id FROM results)",
            params![run_id],
        )?;
        tx.execute("UPDATE run_totals SET total = total + 1 WHERE id = 1", [])?;

        tx.commit()?;
        Ok(())
    }

    fn results(&self) -> HistoryResult<Vec<CrawlResult>> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload FROM results ORDER BY id ASC")?;

        let payloads = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(HistoryError::from))
            .collect()
    }

    fn run_count(&self) -> HistoryResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT total FROM run_totals WHERE id = 1", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn last_run(&self) -> HistoryResult<Option<DateTime<Utc>>> {
        let started: Option<String> = self
            .conn
            .query_row(
                "SELECT started_at FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        started
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| HistoryError::Timestamp(e.to_string()))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::CrawlPhase;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn result(source: &str) -> CrawlResult {
        CrawlResult {
            source: source.to_string(),
            source_id: None,
            phase: CrawlPhase::DeepCrawl,
            url: format!("https://{}/", source),
            grants: vec![],
            errors: vec![],
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap(),
            total_found: 0,
            processing_time_ms: 12,
        }
    }

    fn sources(store: &dyn HistoryStore) -> Vec<String> {
        store.results().unwrap().into_iter().map(|r| r.source).collect()
    }

    fn exercise(store: &mut dyn HistoryStore) {
        let first = Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2026, 3, 2, 2, 0, 0).unwrap();

        assert_eq!(store.run_count().unwrap(), 0);
        assert_eq!(store.last_run().unwrap(), None);

        store.record_run(first, &[result("a"), result("b")]).unwrap();
        store.record_run(second, &[result("c"), result("d")]).unwrap();

        // Capacity 3: the oldest result was evicted
        assert_eq!(sources(store), vec!["b", "c", "d"]);
        assert_eq!(store.run_count().unwrap(), 2);
        assert_eq!(store.last_run().unwrap(), Some(second));
    }

    #[test]
    fn test_memory_history_ring_buffer() {
        let mut store = MemoryHistory::new(3);
        exercise(&mut store);
    }

    #[test]
    fn test_sqlite_history_in_memory() {
        let mut store = SqliteHistory::in_memory(3).unwrap();
        exercise(&mut store);
    }

    #[test]
    fn test_sqlite_history_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.db");

        {
            let mut store = SqliteHistory::open(&path, 10).unwrap();
            store
                .record_run(Utc::now(), &[result("grants.gov"), result("candid.org")])
                .unwrap();
        }

        let store = SqliteHistory::open(&path, 10).unwrap();
        assert_eq!(sources(&store), vec!["grants.gov", "candid.org"]);
        assert_eq!(store.run_count().unwrap(), 1);
        assert_eq!(store.results().unwrap()[0], result("grants.gov"));
    }

    #[test]
    fn test_sqlite_history_prunes_runs_but_keeps_count() {
        let mut store = SqliteHistory::in_memory(2).unwrap();
        let last = Utc.with_ymd_and_hms(2026, 3, 6, 2, 0, 0).unwrap();

        for day in 1..=5 {
            let started = Utc.with_ymd_and_hms(2026, 3, day, 2, 0, 0).unwrap();
            store.record_run(started, &[result("a")]).unwrap();
        }
        store.record_run(last, &[]).unwrap();

        let stored_runs: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stored_runs, 3);
        assert_eq!(store.run_count().unwrap(), 6);
        assert_eq!(store.last_run().unwrap(), Some(last));
        assert_eq!(sources(&store), vec!["a", "a"]);
    }
}
