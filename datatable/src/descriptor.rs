use crate::config::ConnectInfo;
use crate::error::TableError;
use crate::value::{Template, Value};

/// Identifies the logical collection a table instance represents.
///
/// Immutable once built: adapters that derive the key columns themselves
/// build a new descriptor with [`EntityDescriptor::with_key_columns`] before
/// the table instance exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    entity_name: String,
    connect_info: ConnectInfo,
    key_columns: Option<Vec<String>>,
}

impl EntityDescriptor {
    pub fn new(entity_name: impl Into<String>, connect_info: ConnectInfo) -> Self {
        Self {
            entity_name: entity_name.into(),
            connect_info,
            key_columns: None,
        }
    }

    pub fn with_key_columns<S: Into<String>>(
        mut self,
        key_columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.key_columns = Some(key_columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn connect_info(&self) -> &ConnectInfo {
        &self.connect_info
    }

    pub fn key_columns(&self) -> Option<&[String]> {
        self.key_columns.as_deref()
    }

    /// Zip the key columns with `key_values` into a template.
    ///
    /// Arity must match exactly, and an entity without a key cannot be
    /// addressed by key at all (an empty key template would match every row).
    pub fn key_template(&self, key_values: &[Value]) -> Result<Template, TableError> {
        let key_columns = match self.key_columns.as_deref() {
            Some(cols) if !cols.is_empty() => cols,
            _ => {
                return Err(TableError::invalid_argument(format!(
                    "entity '{}' has no key columns",
                    self.entity_name
                )))
            }
        };
        if key_columns.len() != key_values.len() {
            return Err(TableError::invalid_argument(format!(
                "entity '{}' has {} key column(s) {:?}, got {} value(s)",
                self.entity_name,
                key_columns.len(),
                key_columns,
                key_values.len()
            )));
        }
        Ok(key_columns
            .iter()
            .cloned()
            .zip(key_values.iter().cloned())
            .collect())
    }

    /// The key values of `record`, in key-column order. Missing fields are null.
    pub fn key_of(&self, record: &crate::Record) -> Vec<Value> {
        self.key_columns
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|col| record.get(col).cloned().unwrap_or(Value::Null))
            .collect()
    }
}
