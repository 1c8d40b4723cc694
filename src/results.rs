use crate::config::Mode;
use crate::error::ResultError;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

/// Immutable record of a finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub mode: Mode,
    /// Countdown length, Time mode only
    pub duration: Option<u32>,
    /// Words in the target, Words mode only
    pub word_count: Option<u32>,
    pub wpm: u32,
    pub raw_wpm: u32,
    pub accuracy: u32,
    pub consistency: Option<f64>,
    pub correct_chars: usize,
    pub incorrect_chars: usize,
    pub elapsed_secs: f64,
    pub timestamp: DateTime<Local>,
}

impl SessionResult {
    /// Checks the archive applies before accepting a result
    pub fn validate(&self) -> Result<(), ResultError> {
        let invalid = |reason: &str| {
            Err(ResultError::Validation {
                reason: reason.to_string(),
            })
        };
        if self.accuracy > 100 {
            return invalid("accuracy above 100");
        }
        if self.wpm > self.raw_wpm {
            return invalid("wpm above raw wpm");
        }
        match self.mode {
            Mode::Time if self.duration.is_none() => invalid("timed result without duration"),
            Mode::Words if self.word_count.is_none() => invalid("words result without word count"),
            _ => Ok(()),
        }
    }
}

/// Where finished sessions go. Failures are logged by the caller.
pub trait ResultSink {
    fn submit(&mut self, result: &SessionResult) -> Result<(), ResultError>;
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn submit(&mut self, result: &SessionResult) -> Result<(), ResultError> {
        (**self).submit(result)
    }
}

/// Discards every result, for `--no-save`
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ResultSink for NullSink {
    fn submit(&mut self, _result: &SessionResult) -> Result<(), ResultError> {
        Ok(())
    }
}

/// A result as read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResult {
    pub id: i64,
    pub mode: String,
    pub duration: Option<u32>,
    pub word_count: Option<u32>,
    pub wpm: u32,
    pub raw_wpm: u32,
    pub accuracy: f64,
    pub consistency: Option<f64>,
    pub created_at: String,
}

/// SQLite archive of finished sessions
#[derive(Debug)]
pub struct ResultStore {
    conn: Connection,
}

impl ResultStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ResultError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, ResultError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, ResultError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mode TEXT NOT NULL,
                duration INTEGER,
                word_count INTEGER,
                wpm INTEGER NOT NULL,
                raw_wpm INTEGER NOT NULL,
                accuracy REAL NOT NULL,
                consistency REAL,
                correct_chars INTEGER NOT NULL,
                incorrect_chars INTEGER NOT NULL,
                elapsed_secs REAL NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_results_created_at ON results(created_at)",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Validate and insert a result, returning its row id
    pub fn create(&self, result: &SessionResult) -> Result<i64, ResultError> {
        result.validate()?;
        self.conn.execute(
            r#"
            INSERT INTO results
            (mode, duration, word_count, wpm, raw_wpm, accuracy, consistency,
             correct_chars, incorrect_chars, elapsed_secs, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                result.mode.to_string(),
                result.duration,
                result.word_count,
                result.wpm,
                result.raw_wpm,
                result.accuracy as f64,
                result.consistency,
                result.correct_chars as i64,
                result.incorrect_chars as i64,
                result.elapsed_secs,
                result.timestamp.to_rfc3339(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!("stored result #{} ({} wpm)", id, result.wpm);
        Ok(id)
    }

    /// Most recent results first
    pub fn recent(&self, limit: usize) -> Result<Vec<StoredResult>, ResultError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, mode, duration, word_count, wpm, raw_wpm, accuracy, consistency, created_at
            FROM results
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            Ok(StoredResult {
                id: row.get(0)?,
                mode: row.get(1)?,
                duration: row.get(2)?,
                word_count: row.get(3)?,
                wpm: row.get(4)?,
                raw_wpm: row.get(5)?,
                accuracy: row.get(6)?,
                consistency: row.get(7)?,
                created_at: row.get(8)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// WPM of the latest stored session, used to seed the ghost on startup
    pub fn last_wpm(&self) -> Result<Option<u32>, ResultError> {
        let wpm: Option<u32> = self
            .conn
            .query_row("SELECT wpm FROM results ORDER BY id DESC LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(wpm)
    }
}

impl ResultSink for ResultStore {
    fn submit(&mut self, result: &SessionResult) -> Result<(), ResultError> {
        self.create(result).map(|_| ())
    }
}

/// Append-only CSV log of finished sessions
#[derive(Debug, Clone)]
pub struct CsvResultLog {
    path: PathBuf,
}

impl CsvResultLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ResultSink for CsvResultLog {
    fn submit(&mut self, result: &SessionResult) -> Result<(), ResultError> {
        result.validate()?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // If the log doesn't exist yet, it needs a header
        let needs_header = !self.path.exists();

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(result)?;
        writer.flush()?;
        Ok(())
    }
}

/// Submits to several sinks. One failing sink doesn't stop the others and
/// each failure is logged here, so the fan-out itself always succeeds.
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<Box<dyn ResultSink + Send>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl ResultSink + Send + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ResultSink for FanOut {
    fn submit(&mut self, result: &SessionResult) -> Result<(), ResultError> {
        for sink in &mut self.sinks {
            if let Err(e) = sink.submit(result) {
                tracing::warn!("result sink failed: {}", e);
            }
        }
        Ok(())
    }
}

/// Fire-and-forget wrapper: submissions are handed to a worker thread so
/// the caller never waits on disk.
pub struct BackgroundSubmitter {
    tx: Option<Sender<SessionResult>>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundSubmitter {
    pub fn spawn<S>(mut sink: S) -> Self
    where
        S: ResultSink + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<SessionResult>();

        let worker = thread::spawn(move || {
            for result in rx {
                if let Err(e) = sink.submit(&result) {
                    tracing::warn!("failed to save result: {}", e);
                }
            }
        });

        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }
}

impl ResultSink for BackgroundSubmitter {
    fn submit(&mut self, result: &SessionResult) -> Result<(), ResultError> {
        match &self.tx {
            Some(tx) => tx.send(result.clone()).map_err(|_| ResultError::WorkerGone),
            None => Err(ResultError::WorkerGone),
        }
    }
}

impl Drop for BackgroundSubmitter {
    fn drop(&mut self) {
        // closing the channel lets the worker drain what's queued and exit
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
