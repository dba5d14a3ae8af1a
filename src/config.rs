//! Connection configuration store.
//!
//! Flat key-value file (`db.host`, `db.port`, `db.user`, `db.password`,
//! `db.name`), human-editable, absence tolerated. Loading never fails the
//! caller: missing file or missing keys fall back to documented defaults,
//! and the merged result is immediately persisted so the file always
//! reflects what was actually used.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::ConnectionConfig;

pub const CONFIG_FILE: &str = "clubconnect.properties";

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3306;
const DEFAULT_USER: &str = "root";
const DEFAULT_PASSWORD: &str = "root";
const DEFAULT_DATABASE: &str = "clubconnect";

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store backed by `clubconnect.properties` in the working directory.
    pub fn new() -> Self {
        Self::at(CONFIG_FILE)
    }

    /// Store backed by an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Loads the connection config, synthesizing defaults for anything
    /// absent. Always returns a usable config; if the file did not fully
    /// describe one, the merged config is saved back immediately.
    pub fn load(&self) -> ConnectionConfig {
        let (entries, file_present) = match fs::read_to_string(&self.path) {
            Ok(raw) => (parse_properties(&raw), true),
            Err(e) => {
                info!(path = %self.path.display(), error = %e, "no config file; using defaults");
                (HashMap::new(), false)
            }
        };

        let mut complete = file_present;
        let mut get = |key: &str, fallback: &str| -> String {
            match entries.get(key) {
                Some(value) => value.clone(),
                None => {
                    complete = false;
                    fallback.to_string()
                }
            }
        };

        let host = get("db.host", DEFAULT_HOST);
        let port_raw = get("db.port", &DEFAULT_PORT.to_string());
        let username = get("db.user", DEFAULT_USER);
        let password = get("db.password", DEFAULT_PASSWORD);
        // `db.database` accepted as a legacy alias for `db.name`.
        let database = match entries.get("db.name").or_else(|| entries.get("db.database")) {
            Some(value) => value.clone(),
            None => {
                complete = false;
                DEFAULT_DATABASE.to_string()
            }
        };

        let port = port_raw.parse::<u16>().unwrap_or_else(|_| {
            warn!(value = %port_raw, "invalid db.port; falling back to default");
            complete = false;
            DEFAULT_PORT
        });

        let config = ConnectionConfig {
            host,
            port,
            username,
            password,
            database,
        };

        if !complete {
            self.save(&config);
        }

        config
    }

    /// Writes all five fields atomically (temp file + rename). Failure is
    /// logged, never propagated: bootstrap must not be blocked by an
    /// unwritable config file.
    pub fn save(&self, config: &ConnectionConfig) {
        match self.try_save(config) {
            Ok(()) => info!(path = %self.path.display(), "saved connection config"),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to save config file")
            }
        }
    }

    fn try_save(&self, config: &ConnectionConfig) -> EngineResult<()> {
        let contents = format!(
            "# ClubConnect database configuration (auto generated)\n\
             db.host={}\n\
             db.port={}\n\
             db.user={}\n\
             db.password={}\n\
             db.name={}\n",
            config.host, config.port, config.username, config.password, config.database
        );

        self.write_atomic(&contents)
            .map_err(|e| EngineError::config(e.to_string()))
    }

    fn write_atomic(&self, contents: &str) -> std::io::Result<()> {
        let mut tmp = self.path.as_os_str().to_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_properties(raw: &str) -> HashMap<String, String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}
