// ClubConnect persistence core
// Database bootstrap, schema reconciliation, and bulk import/export

pub mod bootstrap;
pub mod bulk;
pub mod config;
pub mod engine;
pub mod observability;
pub mod tasks;

pub use bootstrap::{
    Bootstrap, BootstrapPhase, Connector, MySqlConnector, Ready, RepairConsole, RepairDecision,
    MAX_TRIES,
};
pub use config::ConfigStore;
pub use engine::error::{EngineError, EngineResult};
pub use engine::types::ConnectionConfig;
pub use tasks::{JobHandle, JobId, TaskRunner};
