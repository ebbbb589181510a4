use std::collections::HashMap;
use std::path::Path;

use super::value::ConfigValue;
use super::ConfigError;

/// Load and parse a YAML file if it exists, flattening it into the values map.
pub(crate) fn load_yaml_file(
    path: &Path,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    if path.exists() {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Load(e.to_string()))?;
        load_yaml_str(&content, values)?;
    }
    Ok(())
}

/// Parse a YAML string and flatten it into the values map.
pub(crate) fn load_yaml_str(
    content: &str,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten_yaml("", &yaml, values);
    Ok(())
}

/// Flatten a YAML tree into dot-separated keys.
///
/// Sequences are stored whole under the parent key; maps only contribute
/// their leaves.
pub(crate) fn flatten_yaml(
    prefix: &str,
    value: &serde_yaml::Value,
    out: &mut HashMap<String, ConfigValue>,
) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let key_str = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => format!("{other:?}"),
                };
                let full_key = if prefix.is_empty() {
                    key_str
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(&full_key, v, out);
            }
        }
        serde_yaml::Value::Sequence(seq) => {
            if !prefix.is_empty() {
                out.insert(
                    prefix.to_string(),
                    ConfigValue::List(seq.iter().map(ConfigValue::from_yaml).collect()),
                );
            }
        }
        leaf => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
            }
        }
    }
}

/// Overlay environment variables carrying `prefix`.
///
/// Convention: `DATATABLE_DB_HOST` <-> `datatable.db.host`. A variable that
/// names a key already loaded from YAML (`DATATABLE_POOL_MAX_CONNECTIONS` for
/// `datatable.pool.max_connections`) overrides that key; any other variable is
/// stored under its fully dotted form (see [`env_form`]).
pub(crate) fn overlay_env(prefix: &str, values: &mut HashMap<String, ConfigValue>) {
    let env_prefix = format!("{}_", prefix.to_uppercase());
    for (env_key, env_val) in std::env::vars() {
        if !env_key.starts_with(&env_prefix) {
            continue;
        }
        let existing = values
            .keys()
            .find(|k| k.to_uppercase().replace('.', "_") == env_key)
            .cloned();
        let config_key = existing.unwrap_or_else(|| env_key.to_lowercase().replace('_', "."));
        values.insert(config_key, ConfigValue::String(env_val));
    }
}

/// The key an environment variable for `key` is stored under when no YAML
/// entry existed for it.
pub(crate) fn env_form(key: &str) -> String {
    key.replace('_', ".")
}
