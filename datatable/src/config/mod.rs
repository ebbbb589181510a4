mod loader;
pub mod connect;
pub mod value;

use std::collections::HashMap;
use std::path::Path;

pub use connect::{ConnectInfo, PoolSettings};
pub use value::{ConfigValue, FromConfigValue};

/// Key prefix shared by every setting this crate reads.
pub const PREFIX: &str = "datatable";

/// Error type for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The requested key was not found in the configuration.
    NotFound(String),
    /// The value could not be converted to the requested type.
    TypeMismatch { key: String, expected: &'static str },
    /// An I/O or YAML parsing error occurred while loading config files.
    Load(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "Config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "Config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration loaded from YAML files, `.env` files, and environment variables.
///
/// Resolution order (lowest to highest priority):
/// 1. `datatable.yaml` (base)
/// 2. `datatable-{profile}.yaml` (profile override)
/// 3. `.env` and `.env.{profile}` (loaded into the process environment)
/// 4. Environment variables (`DATATABLE_DB_HOST` overrides `datatable.db.host`)
///
/// `.env` files never overwrite already-set environment variables.
///
/// Profile is determined by: `DATATABLE_PROFILE` env var > argument > `"dev"`.
#[derive(Debug, Clone)]
pub struct DataTableConfig {
    values: HashMap<String, ConfigValue>,
    profile: String,
}

impl DataTableConfig {
    /// Load configuration for the given profile from the current directory.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."), profile)
    }

    /// Load configuration for the given profile from `dir`.
    pub fn load_from(dir: &Path, profile: &str) -> Result<Self, ConfigError> {
        let active_profile =
            std::env::var("DATATABLE_PROFILE").unwrap_or_else(|_| profile.to_string());

        let mut values = HashMap::new();
        loader::load_yaml_file(&dir.join(format!("{PREFIX}.yaml")), &mut values)?;
        loader::load_yaml_file(
            &dir.join(format!("{PREFIX}-{active_profile}.yaml")),
            &mut values,
        )?;

        let _ = dotenvy::from_path(dir.join(".env"));
        let _ = dotenvy::from_path(dir.join(format!(".env.{active_profile}")));

        loader::overlay_env(PREFIX, &mut values);

        tracing::debug!(profile = %active_profile, keys = values.len(), "configuration loaded");
        Ok(DataTableConfig {
            values,
            profile: active_profile,
        })
    }

    /// Create a config from a YAML string (useful for testing).
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(DataTableConfig {
            values,
            profile: profile.to_string(),
        })
    }

    /// Create an empty config: every typed accessor falls back to its default.
    pub fn empty() -> Self {
        DataTableConfig {
            values: HashMap::new(),
            profile: "test".to_string(),
        }
    }

    /// Set a value programmatically.
    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Get a typed value for the given dot-separated key.
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self
            .values
            .get(key)
            .or_else(|| self.values.get(&loader::env_form(key)))
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    /// Get a typed value, returning `default` only when the key is missing.
    ///
    /// A present but malformed value is still an error.
    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> Result<V, ConfigError> {
        match self.get(key) {
            Err(ConfigError::NotFound(_)) => Ok(default),
            other => other,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key) || self.values.contains_key(&loader::env_form(key))
    }

    /// The active profile name.
    pub fn profile(&self) -> &str {
        &self.profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_yaml() {
        let yaml = r#"
datatable:
  db:
    host: "db.internal"
    port: 3307
  server:
    addr: "127.0.0.1:8080"
  links:
    - a
    - b
"#;
        let config = DataTableConfig::from_yaml_str(yaml, "test").unwrap();
        assert_eq!(config.get::<String>("datatable.db.host").unwrap(), "db.internal");
        assert_eq!(config.get::<u16>("datatable.db.port").unwrap(), 3307);
        assert_eq!(
            config.get::<Vec<String>>("datatable.links").unwrap(),
            vec!["a", "b"]
        );
        assert!(config.contains_key("datatable.server.addr"));
    }

    #[test]
    fn test_get_or_distinguishes_missing_from_malformed() {
        let mut config = DataTableConfig::empty();
        assert_eq!(config.get_or("datatable.db.port", 3306u16).unwrap(), 3306);
        config.set("datatable.db.port", ConfigValue::String("not-a-port".into()));
        assert!(matches!(
            config.get_or("datatable.db.port", 3306u16),
            Err(ConfigError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_type_conversions() {
        let mut config = DataTableConfig::empty();
        config.set("int_val", ConfigValue::Integer(42));
        config.set("bool_val", ConfigValue::String("yes".into()));
        config.set("null_val", ConfigValue::Null);

        assert_eq!(config.get::<i64>("int_val").unwrap(), 42);
        assert_eq!(config.get::<String>("int_val").unwrap(), "42");
        assert!(config.get::<bool>("bool_val").unwrap());
        assert!(config.get::<Option<String>>("null_val").unwrap().is_none());
        assert!(matches!(
            config.get::<String>("missing"),
            Err(ConfigError::NotFound(_))
        ));
    }
}
