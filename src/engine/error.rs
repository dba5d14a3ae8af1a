//! Engine error types.
//!
//! One error enum for the whole persistence core. Variants mirror the
//! decisions callers have to make: retry, repair, or skip-and-continue.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Server unreachable or the driver gave up on the handshake.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The server is reachable but rejected the credentials.
    #[error("Authentication rejected: {0}")]
    AuthFailed(String),

    /// Reachable server, but the named database does not exist.
    /// Surfaced distinctly so the orchestrator creates it instead of retrying.
    #[error("Unknown database '{0}'")]
    UnknownDatabase(String),

    #[error("Operation timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// A DDL or seed statement failed during reconciliation.
    #[error("Schema statement failed: {0}")]
    Schema(String),

    #[error("Statement execution failed: {0}")]
    Execution(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Import failed: {0}")]
    Import(String),

    #[error("Export failed: {0}")]
    Export(String),

    /// The task runner is no longer accepting or completing work.
    #[error("Task runner is shut down")]
    Shutdown,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl EngineError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::AuthFailed(msg.into())
    }

    pub fn unknown_database(name: impl Into<String>) -> Self {
        Self::UnknownDatabase(name.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn execution_error(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn import(msg: impl Into<String>) -> Self {
        Self::Import(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// True when retrying the same connection attempt cannot help and the
    /// repair path should take over immediately.
    pub fn is_unknown_database(&self) -> bool {
        matches!(self, Self::UnknownDatabase(_))
    }
}
