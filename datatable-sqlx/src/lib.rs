//! # datatable-sqlx — relational adapter for the `datatable` contract
//!
//! Implements [`DataTable`](datatable::DataTable) over
//! [SQLx](https://github.com/launchbadge/sqlx).
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SqlTable`] | One entity of a SQL store, key columns introspected at open |
//! | [`ConnectionManager`] | Lazy bounded pool plus the per-operation transaction unit |
//! | [`ConnectionManagers`] | One shared manager per store |
//! | [`Backend`] | Driver glue, implemented for `sqlx::Sqlite` and `sqlx::MySql` |
//! | [`SqlxErrorExt`] | `sqlx::Error` → `TableError` (`.into_table_error()`) |
//! | [`QueryOutput`] | Result of the raw `query` passthrough |
//!
//! # Feature flags
//!
//! | Feature  | Driver |
//! |----------|--------|
//! | `sqlite` | SQLite via `sqlx/sqlite` (default) |
//! | `mysql`  | MySQL via `sqlx/mysql` (default) |
//!
//! # Quick start
//!
//! ```ignore
//! use datatable::prelude::*;
//! use datatable::{ConnectInfo, PoolSettings};
//! use datatable_sqlx::{ConnectionManagers, SqlTable};
//! use sqlx::MySql;
//!
//! let connections = ConnectionManagers::<MySql>::new(PoolSettings::default());
//! let orders = SqlTable::open(
//!     EntityDescriptor::new("classicmodels.orders", ConnectInfo::default()),
//!     &connections,
//! )
//! .await?;
//! let order = orders.find_by_primary_key(&[Value::from(10100)], None, None).await?;
//! ```

pub mod backend;
pub mod connection;
pub mod error;
pub mod schema;
pub mod table;

pub use backend::Backend;
pub use connection::{ConnectionManager, ConnectionManagers};
pub use error::SqlxErrorExt;
pub use schema::TableSchema;
pub use table::{QueryOutput, SqlTable};

/// Re-exports of the most commonly used types from both `datatable` and this crate.
pub mod prelude {
    pub use crate::{ConnectionManager, ConnectionManagers, QueryOutput, SqlTable};
    pub use datatable::prelude::*;
}
