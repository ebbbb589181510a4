use std::sync::Arc;

use datatable::{ConnectInfo, EntityDescriptor, PoolSettings, TableError, TableKey, TableRegistry};
use datatable_sqlx::{Backend, ConnectionManagers, SqlTable};

use crate::links::LinkRules;

/// Shared application state: table instances, connection pools, link rules.
pub struct AppState<DB: Backend> {
    pub tables: TableRegistry<SqlTable<DB>>,
    pub connections: ConnectionManagers<DB>,
    pub connect_info: ConnectInfo,
    pub links: Arc<LinkRules>,
}

impl<DB: Backend> Clone for AppState<DB> {
    fn clone(&self) -> Self {
        Self {
            tables: self.tables.clone(),
            connections: self.connections.clone(),
            connect_info: self.connect_info.clone(),
            links: self.links.clone(),
        }
    }
}

impl<DB: Backend> AppState<DB> {
    pub fn new(connect_info: ConnectInfo, pool: PoolSettings, links: LinkRules) -> Self {
        Self {
            tables: TableRegistry::new(),
            connections: ConnectionManagers::new(pool),
            connect_info,
            links: Arc::new(links),
        }
    }

    /// The table for `db`/`table`, opened on first use.
    ///
    /// Stores that address tables as `database.table` get the qualified name;
    /// single-database stores only use the table name.
    pub async fn table(&self, db: &str, table: &str) -> Result<Arc<SqlTable<DB>>, TableError> {
        let key = TableKey::new(db, table);
        let entity = if DB::QUALIFY_WITH_DATABASE {
            format!("{db}.{table}")
        } else {
            table.to_string()
        };
        let descriptor = EntityDescriptor::new(entity, self.connect_info.clone());
        self.tables
            .get_or_try_create(&key, || SqlTable::open(descriptor, &self.connections))
            .await
    }
}
