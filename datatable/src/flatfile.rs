//! A [`DataTable`] over a JSON file: rows live in memory and
//! [`DataTable::save`] writes them back.
//!
//! The descriptor's `connect_info.db` names the directory; the entity is
//! stored in `<db>/<entity>.json` as an array of objects. Dates are written
//! as `{"$date": "2003-01-06"}` and timestamps as
//! `{"$datetime": "2003-01-06T10:00:00"}` so they read back as dates, not text.

use std::collections::{BTreeMap, HashSet};
use std::convert::Infallible;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::descriptor::EntityDescriptor;
use crate::error::TableError;
use crate::table::{Context, DataTable, FindOptions};
use crate::value::{matches, project, Record, Template, Value};

/// On-disk form of a [`Value`].
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Date {
        #[serde(rename = "$date")]
        date: NaiveDate,
    },
    DateTime {
        #[serde(rename = "$datetime")]
        datetime: NaiveDateTime,
    },
    Plain(Value),
}

impl From<Value> for StoredValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Date(date) => StoredValue::Date { date },
            Value::DateTime(datetime) => StoredValue::DateTime { datetime },
            other => StoredValue::Plain(other),
        }
    }
}

impl From<StoredValue> for Value {
    fn from(stored: StoredValue) -> Self {
        match stored {
            StoredValue::Date { date } => Value::Date(date),
            StoredValue::DateTime { datetime } => Value::DateTime(datetime),
            StoredValue::Plain(value) => value,
        }
    }
}

type StoredRecord = BTreeMap<String, StoredValue>;

fn decode_rows(bytes: &[u8]) -> Result<Vec<Record>, TableError> {
    let stored: Vec<StoredRecord> = serde_json::from_slice(bytes)?;
    Ok(stored
        .into_iter()
        .map(|row| row.into_iter().map(|(k, v)| (k, v.into())).collect())
        .collect())
}

fn encode_rows(rows: &[Record]) -> Result<Vec<u8>, TableError> {
    let stored: Vec<StoredRecord> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|(k, v)| (k.clone(), StoredValue::from(v.clone())))
                .collect()
        })
        .collect();
    Ok(serde_json::to_vec_pretty(&stored)?)
}

/// The entity becomes a file name inside the store directory, so it must be
/// a single plain path component.
fn check_entity_name(name: &str) -> Result<(), TableError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(TableError::invalid_argument(format!(
            "Invalid flat-file entity name: {name:?}"
        )));
    }
    Ok(())
}

pub struct FlatFileTable {
    descriptor: EntityDescriptor,
    path: PathBuf,
    rows: RwLock<Vec<Record>>,
}

impl FlatFileTable {
    /// Open (or start) the file for `descriptor`. Key columns are mandatory.
    pub async fn open(descriptor: EntityDescriptor) -> Result<Self, TableError> {
        match descriptor.key_columns() {
            Some(cols) if !cols.is_empty() => {}
            _ => {
                return Err(TableError::invalid_argument(format!(
                    "flat-file entity '{}' requires key columns",
                    descriptor.entity_name()
                )))
            }
        }
        check_entity_name(descriptor.entity_name())?;
        let path = Path::new(&descriptor.connect_info().db)
            .join(format!("{}.json", descriptor.entity_name()));
        let rows = match tokio::fs::read(&path).await {
            Ok(bytes) => decode_rows(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(TableError::connection_failed(format!(
                    "cannot read {}: {e}",
                    path.display()
                )))
            }
        };
        tracing::debug!(entity = descriptor.entity_name(), rows = rows.len(), path = %path.display(), "flat-file table opened");
        Ok(Self {
            descriptor,
            path,
            rows: RwLock::new(rows),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn key_string(&self, record: &Record) -> Result<String, TableError> {
        Ok(serde_json::to_string(&self.descriptor.key_of(record))?)
    }

    fn require_key(&self, record: &Record) -> Result<(), TableError> {
        for col in self.descriptor.key_columns().unwrap_or_default() {
            if record.get(col).map_or(true, Value::is_null) {
                return Err(TableError::invalid_argument(format!(
                    "record is missing key column '{col}'"
                )));
            }
        }
        Ok(())
    }

    /// Reject a candidate row set whose keys are not unique.
    fn check_unique(&self, rows: &[Record]) -> Result<(), TableError> {
        let mut seen = HashSet::with_capacity(rows.len());
        for row in rows {
            let key = self.key_string(row)?;
            if !seen.insert(key.clone()) {
                return Err(TableError::duplicate_key(format!(
                    "duplicate key {key} in '{}'",
                    self.descriptor.entity_name()
                )));
            }
        }
        Ok(())
    }

    async fn update_matching(&self, filter: &Template, new_values: &Record) -> Result<u64, TableError> {
        if new_values.is_empty() {
            return Err(TableError::invalid_argument("update requires at least one new value"));
        }
        let mut rows = self.rows.write().await;
        let mut candidate = rows.clone();
        let mut count = 0u64;
        for row in candidate.iter_mut().filter(|r| matches(r, filter)) {
            row.extend(new_values.iter().map(|(k, v)| (k.clone(), v.clone())));
            self.require_key(row)?;
            count += 1;
        }
        // All or nothing: the live rows are replaced only if every key stays present and unique.
        self.check_unique(&candidate)?;
        *rows = candidate;
        Ok(count)
    }

    async fn delete_matching(&self, filter: &Template) -> u64 {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| !matches(r, filter));
        (before - rows.len()) as u64
    }
}

impl DataTable for FlatFileTable {
    type Native = Infallible;

    fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    async fn find_by_primary_key(
        &self,
        key_values: &[Value],
        fields: Option<&[String]>,
        _ctx: Option<&Context>,
    ) -> Result<Option<Record>, TableError> {
        let filter = self.descriptor.key_template(key_values)?;
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|r| matches(r, &filter)).map(|r| project(r, fields)))
    }

    async fn find_by_template(
        &self,
        template: &Template,
        options: &FindOptions,
        ctx: Option<&Context>,
    ) -> Result<Vec<Record>, TableError> {
        if !options.order_by.is_empty() {
            return Err(TableError::not_implemented(
                "order_by is not supported by flat-file tables",
            ));
        }
        tracing::debug!(
            entity = self.descriptor.entity_name(),
            request_id = Context::request_id_of(ctx),
            "find_by_template"
        );
        let rows = self.rows.read().await;
        let offset = options.offset.unwrap_or(0) as usize;
        let limit = options.limit.map_or(usize::MAX, |l| l as usize);
        Ok(rows
            .iter()
            .filter(|r| matches(r, template))
            .skip(offset)
            .take(limit)
            .map(|r| project(r, options.field_list()))
            .collect())
    }

    async fn insert(&self, record: &Record, _ctx: Option<&Context>) -> Result<(), TableError> {
        self.require_key(record)?;
        let key = self.key_string(record)?;
        let mut rows = self.rows.write().await;
        for row in rows.iter() {
            if self.key_string(row)? == key {
                return Err(TableError::duplicate_key(format!(
                    "duplicate key {key} in '{}'",
                    self.descriptor.entity_name()
                )));
            }
        }
        rows.push(record.clone());
        Ok(())
    }

    async fn delete_by_template(&self, template: &Template, _ctx: Option<&Context>) -> Result<u64, TableError> {
        Ok(self.delete_matching(template).await)
    }

    async fn delete_by_key(&self, key_values: &[Value], _ctx: Option<&Context>) -> Result<u64, TableError> {
        let filter = self.descriptor.key_template(key_values)?;
        Ok(self.delete_matching(&filter).await)
    }

    async fn update_by_template(
        &self,
        template: &Template,
        new_values: &Record,
        _ctx: Option<&Context>,
    ) -> Result<u64, TableError> {
        self.update_matching(template, new_values).await
    }

    async fn update_by_key(
        &self,
        key_values: &[Value],
        new_values: &Record,
        _ctx: Option<&Context>,
    ) -> Result<u64, TableError> {
        let filter = self.descriptor.key_template(key_values)?;
        self.update_matching(&filter, new_values).await
    }

    async fn query(
        &self,
        _statement: &str,
        _args: &[Value],
        _ctx: Option<&Context>,
    ) -> Result<Infallible, TableError> {
        Err(TableError::not_implemented(
            "flat-file tables have no native query language",
        ))
    }

    async fn load(&self, rows: Option<Vec<Record>>, _ctx: Option<&Context>) -> Result<u64, TableError> {
        let Some(new_rows) = rows else {
            return Ok(0);
        };
        for row in &new_rows {
            self.require_key(row)?;
        }
        let mut live = self.rows.write().await;
        let mut candidate = live.clone();
        let count = new_rows.len() as u64;
        candidate.extend(new_rows);
        self.check_unique(&candidate)?;
        *live = candidate;
        Ok(count)
    }

    async fn save(&self, ctx: Option<&Context>) -> Result<(), TableError> {
        let rows = self.rows.read().await;
        let bytes = encode_rows(&rows)?;
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!(
            entity = self.descriptor.entity_name(),
            rows = rows.len(),
            request_id = Context::request_id_of(ctx),
            "flat-file table saved"
        );
        Ok(())
    }
}
