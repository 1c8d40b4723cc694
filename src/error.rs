/// Errors raised by the session state machine.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SessionError {
    /// Config changes are only accepted while the session is idle.
    #[error("config can only change while idle (session is {state})")]
    ConfigLocked {
        /// State the session was in when the change was attempted.
        state: crate::session::SessionState,
    },
}

/// Errors raised while loading a word corpus.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("corpus not found: {0}")]
    NotFound(String),

    #[error("corpus is not valid utf-8: {0}")]
    Encoding(String),

    #[error("malformed corpus: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("corpus {0} has no words")]
    Empty(String),
}

/// Errors raised at the result submission boundary.
#[derive(Debug, thiserror::Error)]
pub enum ResultError {
    /// The result failed validation and was not stored.
    #[error("invalid result: {reason}")]
    Validation {
        /// Why the result was rejected.
        reason: String,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The background submission worker has shut down.
    #[error("submission worker is gone")]
    WorkerGone,
}
