//! # datatable — one CRUD-and-query contract over heterogeneous stores
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DataTable`] | The contract every adapter implements |
//! | [`Template`] / [`Record`] / [`Value`] | Equality filters, rows, scalars |
//! | [`EntityDescriptor`] | Entity name, store coordinates, key columns |
//! | [`StatementBuilder`] | SQL composition on top of the [`mod@template`] translator |
//! | [`TableRegistry`] | Construct-once cache of table instances |
//! | [`FlatFileTable`] | JSON-file adapter |
//! | [`DataTableConfig`] | YAML + `.env` + environment configuration |
//!
//! The relational adapter lives in `datatable-sqlx`.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod flatfile;
pub mod query;
pub mod registry;
pub mod table;
pub mod template;
pub mod value;

pub use config::{ConfigError, ConnectInfo, DataTableConfig, PoolSettings};
pub use descriptor::EntityDescriptor;
pub use error::{ErrorKind, TableError, TableResult};
pub use flatfile::FlatFileTable;
pub use query::{Dialect, Statement, StatementBuilder};
pub use registry::{TableKey, TableRegistry};
pub use table::{Context, DataTable, FindOptions, OrderBy};
pub use value::{template, Record, Template, Value};

pub mod prelude {
    //! Re-exports of the most commonly used types.
    pub use crate::{
        template, Context, DataTable, EntityDescriptor, ErrorKind, FindOptions, OrderBy, Record,
        TableError, Template, Value,
    };
}
