use datatable::{Record, TableError};

/// Columns and primary key of one entity, as reported by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    /// Every column, in declaration order.
    pub columns: Vec<String>,
    /// Primary-key columns, in key order. Empty when the entity has no key.
    pub key_columns: Vec<String>,
}

impl TableSchema {
    pub fn new(columns: Vec<String>, key_columns: Vec<String>) -> Self {
        Self {
            columns,
            key_columns,
        }
    }

    /// An entity with no columns does not exist.
    pub fn exists(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// The store's spelling of `name`. Column names compare ASCII
    /// case-insensitively, as they do in SQLite and MySQL; an exact match wins.
    pub fn column(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| *c == name)
            .or_else(|| self.columns.iter().find(|c| c.eq_ignore_ascii_case(name)))
            .map(String::as_str)
    }

    /// Map every name onto its column, or fail on the first unknown one.
    pub fn resolve_columns<'a, I>(&self, entity: &str, names: I) -> Result<Vec<String>, TableError>
    where
        I: IntoIterator<Item = &'a String>,
    {
        names
            .into_iter()
            .map(|name| {
                self.column(name).map(String::from).ok_or_else(|| {
                    TableError::query_failed(format!("unknown column '{name}' in '{entity}'"))
                })
            })
            .collect()
    }

    /// Re-key a template or record by column spelling. Two keys naming the
    /// same column are rejected.
    pub fn resolve_record(&self, entity: &str, record: &Record) -> Result<Record, TableError> {
        let mut resolved = Record::new();
        for (name, value) in record {
            let column = self.column(name).ok_or_else(|| {
                TableError::query_failed(format!("unknown column '{name}' in '{entity}'"))
            })?;
            if resolved.insert(column.to_string(), value.clone()).is_some() {
                return Err(TableError::invalid_argument(format!(
                    "column '{column}' is given more than once"
                )));
            }
        }
        Ok(resolved)
    }
}

/// Split `schema.table` into its parts; an unqualified name has no schema.
pub fn split_qualified(entity: &str) -> (Option<&str>, &str) {
    match entity.split_once('.') {
        Some((schema, table)) => (Some(schema), table),
        None => (None, entity),
    }
}
