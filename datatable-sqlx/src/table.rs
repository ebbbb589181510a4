use datatable::{
    Context, DataTable, EntityDescriptor, FindOptions, Record, Statement, StatementBuilder,
    TableError, Template, Value,
};

use crate::backend::Backend;
use crate::connection::{ConnectionManager, ConnectionManagers};
use crate::schema::TableSchema;

/// Leading keywords of statements that produce a result set.
const ROW_RETURNING: &[&str] = &["SELECT", "WITH", "SHOW", "PRAGMA", "DESCRIBE", "DESC", "EXPLAIN"];

/// Result of [`SqlTable::query`](DataTable::query).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub rows: Vec<Record>,
    pub rows_affected: u64,
}

/// The relational [`DataTable`]: one entity of a SQL store.
///
/// Key columns come from the store's own metadata at construction, and every
/// identifier a caller supplies (template keys, field lists, order-by
/// columns, record keys) is resolved against the introspected column list
/// before any statement is built. Names match case-insensitively and are
/// rewritten to the store's spelling, so returned records use it too. Values are always bound parameters.
///
/// # Example
///
/// ```ignore
/// let connections = ConnectionManagers::<Sqlite>::new(PoolSettings::default());
/// let orders = SqlTable::open(EntityDescriptor::new("orders", info), &connections).await?;
/// let open = orders
///     .find_by_template(&template([("status", "open")]), &FindOptions::default(), None)
///     .await?;
/// ```
pub struct SqlTable<DB: Backend> {
    descriptor: EntityDescriptor,
    schema: TableSchema,
    statements: StatementBuilder,
    manager: ConnectionManager<DB>,
}

impl<DB: Backend> SqlTable<DB> {
    /// Open `descriptor` on the shared manager for its store.
    pub async fn open(
        descriptor: EntityDescriptor,
        connections: &ConnectionManagers<DB>,
    ) -> Result<Self, TableError> {
        let manager = connections.manager_for(descriptor.connect_info());
        Self::with_manager(descriptor, manager).await
    }

    /// Open `descriptor` on a specific manager.
    ///
    /// Fails with `InvalidArgument` if the descriptor already carries key
    /// columns, and with `QueryFailed` if the entity does not exist.
    pub async fn with_manager(
        descriptor: EntityDescriptor,
        manager: ConnectionManager<DB>,
    ) -> Result<Self, TableError> {
        if descriptor.key_columns().is_some() {
            return Err(TableError::invalid_argument(format!(
                "key columns of '{}' are read from the store and cannot be supplied",
                descriptor.entity_name()
            )));
        }
        let statements = StatementBuilder::new(descriptor.entity_name(), DB::DIALECT)?;

        let entity = descriptor.entity_name().to_string();
        let schema = manager
            .transaction(move |conn| Box::pin(async move { DB::introspect(conn, &entity).await }))
            .await?;
        if !schema.exists() {
            return Err(TableError::query_failed(format!(
                "entity '{}' does not exist",
                descriptor.entity_name()
            )));
        }
        tracing::debug!(
            entity = descriptor.entity_name(),
            columns = schema.columns.len(),
            key = ?schema.key_columns,
            "table opened"
        );

        Ok(Self {
            descriptor: descriptor.with_key_columns(schema.key_columns.clone()),
            schema,
            statements,
            manager,
        })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn manager(&self) -> &ConnectionManager<DB> {
        &self.manager
    }

    fn entity(&self) -> &str {
        self.descriptor.entity_name()
    }

    fn resolve(&self, record: &Record) -> Result<Record, TableError> {
        self.schema.resolve_record(self.entity(), record)
    }

    fn resolve_options(&self, options: &FindOptions) -> Result<FindOptions, TableError> {
        let mut resolved = options.clone();
        if let Some(fields) = options.field_list() {
            resolved.fields = Some(self.schema.resolve_columns(self.entity(), fields)?);
        }
        let columns = self
            .schema
            .resolve_columns(self.entity(), options.order_by.iter().map(|o| &o.column))?;
        for (order, column) in resolved.order_by.iter_mut().zip(columns) {
            order.column = column;
        }
        Ok(resolved)
    }

    async fn fetch(
        &self,
        op: &'static str,
        stmt: Statement,
        ctx: Option<&Context>,
    ) -> Result<Vec<Record>, TableError> {
        tracing::debug!(
            entity = self.entity(),
            op,
            request_id = Context::request_id_of(ctx),
            sql = %stmt.sql,
            "fetch"
        );
        let rows = self
            .manager
            .transaction(move |conn| {
                Box::pin(async move { DB::fetch_all(conn, &stmt.sql, &stmt.args).await })
            })
            .await?;
        tracing::debug!(entity = self.entity(), op, rows = rows.len(), "fetched");
        Ok(rows)
    }

    async fn execute(
        &self,
        op: &'static str,
        stmt: Statement,
        ctx: Option<&Context>,
    ) -> Result<u64, TableError> {
        tracing::debug!(
            entity = self.entity(),
            op,
            request_id = Context::request_id_of(ctx),
            sql = %stmt.sql,
            "execute"
        );
        let affected = self
            .manager
            .transaction(move |conn| {
                Box::pin(async move { DB::execute(conn, &stmt.sql, &stmt.args).await })
            })
            .await?;
        tracing::debug!(entity = self.entity(), op, rows = affected, "executed");
        Ok(affected)
    }
}

impl<DB: Backend> DataTable for SqlTable<DB> {
    type Native = QueryOutput;

    fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    async fn find_by_primary_key(
        &self,
        key_values: &[Value],
        fields: Option<&[String]>,
        ctx: Option<&Context>,
    ) -> Result<Option<Record>, TableError> {
        let filter = self.descriptor.key_template(key_values)?;
        let mut options = FindOptions::default().limit(1);
        options.fields = fields.map(<[String]>::to_vec);
        let options = self.resolve_options(&options)?;
        let stmt = self.statements.select(&filter, &options)?;
        Ok(self
            .fetch("find_by_primary_key", stmt, ctx)
            .await?
            .into_iter()
            .next())
    }

    async fn find_by_template(
        &self,
        template: &Template,
        options: &FindOptions,
        ctx: Option<&Context>,
    ) -> Result<Vec<Record>, TableError> {
        let template = self.resolve(template)?;
        let options = self.resolve_options(options)?;
        let stmt = self.statements.select(&template, &options)?;
        self.fetch("find_by_template", stmt, ctx).await
    }

    async fn insert(&self, record: &Record, ctx: Option<&Context>) -> Result<(), TableError> {
        let record = self.resolve(record)?;
        let stmt = self.statements.insert(&record)?;
        self.execute("insert", stmt, ctx).await.map(|_| ())
    }

    async fn delete_by_template(
        &self,
        template: &Template,
        ctx: Option<&Context>,
    ) -> Result<u64, TableError> {
        let template = self.resolve(template)?;
        let stmt = self.statements.delete(&template)?;
        self.execute("delete_by_template", stmt, ctx).await
    }

    async fn delete_by_key(
        &self,
        key_values: &[Value],
        ctx: Option<&Context>,
    ) -> Result<u64, TableError> {
        let filter = self.descriptor.key_template(key_values)?;
        let stmt = self.statements.delete(&filter)?;
        self.execute("delete_by_key", stmt, ctx).await
    }

    async fn update_by_template(
        &self,
        template: &Template,
        new_values: &Record,
        ctx: Option<&Context>,
    ) -> Result<u64, TableError> {
        let template = self.resolve(template)?;
        let new_values = self.resolve(new_values)?;
        let stmt = self.statements.update(&template, &new_values)?;
        self.execute("update_by_template", stmt, ctx).await
    }

    async fn update_by_key(
        &self,
        key_values: &[Value],
        new_values: &Record,
        ctx: Option<&Context>,
    ) -> Result<u64, TableError> {
        let filter = self.descriptor.key_template(key_values)?;
        let new_values = self.resolve(new_values)?;
        let stmt = self.statements.update(&filter, &new_values)?;
        self.execute("update_by_key", stmt, ctx).await
    }

    async fn query(
        &self,
        statement: &str,
        args: &[Value],
        ctx: Option<&Context>,
    ) -> Result<QueryOutput, TableError> {
        let stmt = Statement {
            sql: statement.to_string(),
            args: args.to_vec(),
        };
        if returns_rows(statement) {
            let rows = self.fetch("query", stmt, ctx).await?;
            Ok(QueryOutput {
                rows,
                rows_affected: 0,
            })
        } else {
            let rows_affected = self.execute("query", stmt, ctx).await?;
            Ok(QueryOutput {
                rows: Vec::new(),
                rows_affected,
            })
        }
    }

    /// Insert every row in one transaction: a failing row rolls back all of them.
    async fn load(&self, rows: Option<Vec<Record>>, ctx: Option<&Context>) -> Result<u64, TableError> {
        let Some(rows) = rows else {
            return Ok(0);
        };
        let mut statements = Vec::with_capacity(rows.len());
        for row in &rows {
            statements.push(self.statements.insert(&self.resolve(row)?)?);
        }
        tracing::debug!(
            entity = self.entity(),
            op = "load",
            request_id = Context::request_id_of(ctx),
            rows = statements.len(),
            "load"
        );
        self.manager
            .transaction(move |conn| {
                Box::pin(async move {
                    let mut loaded = 0;
                    for stmt in &statements {
                        loaded += DB::execute(&mut *conn, &stmt.sql, &stmt.args).await?;
                    }
                    Ok(loaded)
                })
            })
            .await
    }

    /// Every statement already commits on success; nothing is buffered.
    async fn save(&self, ctx: Option<&Context>) -> Result<(), TableError> {
        tracing::debug!(
            entity = self.entity(),
            op = "save",
            request_id = Context::request_id_of(ctx),
            "nothing to flush"
        );
        Ok(())
    }
}

fn returns_rows(statement: &str) -> bool {
    let first = statement
        .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();
    ROW_RETURNING.iter().any(|kw| first.eq_ignore_ascii_case(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returns_rows() {
        assert!(returns_rows("select * from orders"));
        assert!(returns_rows("  (SELECT 1)"));
        assert!(returns_rows("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(returns_rows("PRAGMA table_info(orders)"));
        assert!(!returns_rows("UPDATE orders SET status = 'x'"));
        assert!(!returns_rows("DELETE FROM orders"));
        assert!(!returns_rows(""));
    }
}
