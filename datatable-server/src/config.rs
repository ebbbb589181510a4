use datatable::{ConfigError, ConnectInfo, DataTableConfig, PoolSettings};

pub const DEFAULT_ADDR: &str = "0.0.0.0:5000";

/// Which sqlx backend serves the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Sqlite,
    MySql,
}

impl Driver {
    /// `datatable.db.driver` when set, otherwise inferred from the URL scheme.
    fn resolve(config: &DataTableConfig, connect: &ConnectInfo) -> Result<Self, ConfigError> {
        match config.get::<String>("datatable.db.driver") {
            Ok(name) => match name.to_ascii_lowercase().as_str() {
                "sqlite" => Ok(Driver::Sqlite),
                "mysql" => Ok(Driver::MySql),
                _ => Err(ConfigError::TypeMismatch {
                    key: "datatable.db.driver".into(),
                    expected: "\"sqlite\" or \"mysql\"",
                }),
            },
            Err(ConfigError::NotFound(_)) => Ok(match &connect.url {
                Some(url) if url.starts_with("sqlite:") => Driver::Sqlite,
                _ => Driver::MySql,
            }),
            Err(e) => Err(e),
        }
    }
}

/// Everything the server reads from configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub driver: Driver,
    pub connect: ConnectInfo,
    pub pool: PoolSettings,
}

impl ServerConfig {
    pub fn from_config(config: &DataTableConfig) -> Result<Self, ConfigError> {
        let connect = ConnectInfo::from_config(config)?;
        Ok(Self {
            addr: config.get_or("datatable.server.addr", DEFAULT_ADDR.to_string())?,
            driver: Driver::resolve(config, &connect)?,
            pool: PoolSettings::from_config(config)?,
            connect,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_config(&DataTableConfig::empty()).unwrap();
        assert_eq!(config.addr, DEFAULT_ADDR);
        assert_eq!(config.driver, Driver::MySql);
        assert_eq!(config.connect, ConnectInfo::default());
    }

    #[test]
    fn test_driver_from_url_and_key() {
        let yaml = "datatable:\n  db:\n    url: \"sqlite::memory:\"\n  server:\n    addr: \"127.0.0.1:8080\"\n";
        let config = ServerConfig::from_config(&DataTableConfig::from_yaml_str(yaml, "test").unwrap()).unwrap();
        assert_eq!(config.driver, Driver::Sqlite);
        assert_eq!(config.addr, "127.0.0.1:8080");

        let yaml = "datatable:\n  db:\n    driver: postgres\n";
        let config = DataTableConfig::from_yaml_str(yaml, "test").unwrap();
        assert!(ServerConfig::from_config(&config).is_err());
    }
}
