// Persistence Engine Module
// Connection factory, schema reconciliation, and row plumbing for MySQL

pub mod connection;
pub mod error;
pub mod query;
pub mod schema;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use schema::{SchemaReport, TableSpec, REQUIRED_TABLES};
pub use types::*;
