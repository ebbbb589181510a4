use std::time::Duration;

use super::{ConfigError, DataTableConfig};

/// Coordinates of a backing store.
///
/// Absent explicit coordinates, [`ConnectInfo::default`] points at a local
/// MySQL server (`dbuser@localhost:3306/newbook`).
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectInfo {
    pub host: String,
    pub user: String,
    pub password: String,
    pub db: String,
    pub port: u16,
    /// Full connection URL. When set it wins over the individual coordinates
    /// (SQLite files and `sqlite::memory:` are addressed this way).
    pub url: Option<String>,
}

impl Default for ConnectInfo {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            user: "dbuser".to_string(),
            password: "dbuserdbuser".to_string(),
            db: "newbook".to_string(),
            port: 3306,
            url: None,
        }
    }
}

impl ConnectInfo {
    /// Coordinates given only as a URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Read `datatable.db.*`, falling back to the defaults key by key.
    pub fn from_config(config: &DataTableConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: config.get_or("datatable.db.host", defaults.host)?,
            user: config.get_or("datatable.db.user", defaults.user)?,
            password: config.get_or("datatable.db.password", defaults.password)?,
            db: config.get_or("datatable.db.name", defaults.db)?,
            port: config.get_or("datatable.db.port", defaults.port)?,
            url: config.get_or("datatable.db.url", None)?,
        })
    }

    /// Identifier of the store these coordinates address.
    ///
    /// Two `ConnectInfo`s with the same store id share a connection pool when
    /// managers are handed out by store.
    pub fn store_id(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

// The password never reaches logs.
impl std::fmt::Debug for ConnectInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectInfo")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("db", &self.db)
            .field("port", &self.port)
            .field("url", &self.url.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Sizing and deadlines for a connection pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Deadline applied to every statement-plus-commit unit.
    pub statement_timeout: Duration,
    /// `None` keeps idle connections forever.
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            statement_timeout: Duration::from_secs(30),
            idle_timeout: None,
            max_lifetime: None,
        }
    }
}

impl PoolSettings {
    /// Read `datatable.pool.*`. Durations are given in milliseconds.
    pub fn from_config(config: &DataTableConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| -> Result<Duration, ConfigError> {
            config
                .get_or(key, default.as_millis() as u64)
                .map(Duration::from_millis)
        };
        let optional_millis = |key: &str| -> Result<Option<Duration>, ConfigError> {
            Ok(config
                .get_or::<Option<u64>>(key, None)?
                .map(Duration::from_millis))
        };
        Ok(Self {
            max_connections: config
                .get_or("datatable.pool.max_connections", defaults.max_connections)?,
            acquire_timeout: millis("datatable.pool.acquire_timeout_ms", defaults.acquire_timeout)?,
            statement_timeout: millis(
                "datatable.pool.statement_timeout_ms",
                defaults.statement_timeout,
            )?,
            idle_timeout: optional_millis("datatable.pool.idle_timeout_ms")?,
            max_lifetime: optional_millis("datatable.pool.max_lifetime_ms")?,
        })
    }

    /// A single-connection pool, as needed by `sqlite::memory:` databases.
    pub fn single_connection() -> Self {
        Self {
            max_connections: 1,
            ..Self::default()
        }
    }
}
