//! Connection descriptor, assembled once at startup.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};

/// Template the connection string is rendered from.
pub const CONNECTION_TEMPLATE: &str =
    "Server=%SERVER%; Port=%PORT%; Database=%DB%; UID=%USERNAME%; password=%PASSWORD%;";

const REDACTED: &str = "********";

fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Database connection configuration.
///
/// SQLite is embedded, so `database` is the path of the database file;
/// server, port and credentials are carried for the connection string.
/// The password never appears in `Debug` output or serialized form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    pub server: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    /// How long a connection waits on a locked database.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl DbConfig {
    pub fn new(
        server: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            port,
            database: database.into(),
            username: username.into(),
            password: password.into(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    /// Reads `RECORDS_DB_*` environment variables, defaulting unset ones.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str, default: &str| {
            std::env::var(name).unwrap_or_else(|_| default.to_string())
        };

        let port = var("RECORDS_DB_PORT", "0")
            .parse::<u16>()
            .map_err(|e| DbError::Config(format!("RECORDS_DB_PORT: {e}")))?;
        let busy_timeout_ms = match std::env::var("RECORDS_DB_BUSY_TIMEOUT_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|e| DbError::Config(format!("RECORDS_DB_BUSY_TIMEOUT_MS: {e}")))?,
            Err(_) => default_busy_timeout_ms(),
        };

        Ok(Self {
            server: var("RECORDS_DB_SERVER", "localhost"),
            port,
            database: var("RECORDS_DB_NAME", "records.db"),
            username: var("RECORDS_DB_USER", ""),
            password: var("RECORDS_DB_PASSWORD", ""),
            busy_timeout_ms,
        })
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn connection_string(&self) -> String {
        self.render(&self.password)
    }

    /// Connection string with the password masked, safe to log.
    pub fn redacted_connection_string(&self) -> String {
        self.render(REDACTED)
    }

    fn render(&self, password: &str) -> String {
        CONNECTION_TEMPLATE
            .replace("%SERVER%", &self.server)
            .replace("%PORT%", &self.port.to_string())
            .replace("%DB%", &self.database)
            .replace("%USERNAME%", &self.username)
            .replace("%PASSWORD%", password)
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("busy_timeout_ms", &self.busy_timeout_ms)
            .finish()
    }
}
