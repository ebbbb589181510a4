use std::collections::BTreeMap;
use std::future::Future;

use crate::descriptor::EntityDescriptor;
use crate::error::TableError;
use crate::value::{Record, Template, Value};

/// Execution context threaded through every operation.
///
/// Adapters only log it; they never interpret it.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub request_id: Option<String>,
    pub principal: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

impl Context {
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            ..Self::default()
        }
    }

    /// The request id for log fields, `"-"` when absent.
    pub fn request_id_of(ctx: Option<&Context>) -> &str {
        ctx.and_then(|c| c.request_id.as_deref()).unwrap_or("-")
    }
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }
}

/// Optional refinements of [`DataTable::find_by_template`].
///
/// An adapter that cannot honour a refinement must reject it with
/// `NotImplemented` instead of ignoring it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Columns to project. `None` (or empty) returns every column.
    pub fields: Option<Vec<String>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub order_by: Vec<OrderBy>,
}

impl FindOptions {
    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn field_list(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }
}

/// The CRUD-and-query contract every backend adapter implements.
///
/// Uses RPITIT (return-position `impl Trait` in traits) — no `async-trait` needed.
///
/// Key-addressed operations take the key values in the order of the
/// descriptor's key columns; a length mismatch is `InvalidArgument`.
/// Template-addressed operations treat an empty template as "every record".
pub trait DataTable: Send + Sync {
    /// Result of [`DataTable::query`]: the one backend-specific shape in the contract.
    type Native: Send;

    fn descriptor(&self) -> &EntityDescriptor;

    /// Returns `Ok(None)` when no record has this key.
    fn find_by_primary_key(
        &self,
        key_values: &[Value],
        fields: Option<&[String]>,
        ctx: Option<&Context>,
    ) -> impl Future<Output = Result<Option<Record>, TableError>> + Send;

    /// Returns an empty vector, never an error, when nothing matches.
    fn find_by_template(
        &self,
        template: &Template,
        options: &FindOptions,
        ctx: Option<&Context>,
    ) -> impl Future<Output = Result<Vec<Record>, TableError>> + Send;

    /// Atomic: a `DuplicateKey` failure leaves the store unchanged.
    fn insert(
        &self,
        record: &Record,
        ctx: Option<&Context>,
    ) -> impl Future<Output = Result<(), TableError>> + Send;

    /// Deletes every match and returns the count. The empty template deletes
    /// everything, unguarded.
    fn delete_by_template(
        &self,
        template: &Template,
        ctx: Option<&Context>,
    ) -> impl Future<Output = Result<u64, TableError>> + Send;

    /// Returns 0 or 1.
    fn delete_by_key(
        &self,
        key_values: &[Value],
        ctx: Option<&Context>,
    ) -> impl Future<Output = Result<u64, TableError>> + Send;

    /// All-or-nothing: if any matched record would collide on a unique key the
    /// whole call fails with `DuplicateKey` and no record is modified.
    fn update_by_template(
        &self,
        template: &Template,
        new_values: &Record,
        ctx: Option<&Context>,
    ) -> impl Future<Output = Result<u64, TableError>> + Send;

    /// Returns 0 or 1, with the same duplicate-key atomicity as
    /// [`DataTable::update_by_template`].
    fn update_by_key(
        &self,
        key_values: &[Value],
        new_values: &Record,
        ctx: Option<&Context>,
    ) -> impl Future<Output = Result<u64, TableError>> + Send;

    /// Pass a raw statement straight to the store. Not validated or translated.
    fn query(
        &self,
        statement: &str,
        args: &[Value],
        ctx: Option<&Context>,
    ) -> impl Future<Output = Result<Self::Native, TableError>> + Send;

    /// Bulk-ingest already materialized rows, bypassing template translation.
    fn load(
        &self,
        rows: Option<Vec<Record>>,
        ctx: Option<&Context>,
    ) -> impl Future<Output = Result<u64, TableError>> + Send;

    /// Flush buffered state to the durable store.
    fn save(&self, ctx: Option<&Context>) -> impl Future<Output = Result<(), TableError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_options_builder() {
        let opts = FindOptions::default()
            .fields(["orderNumber", "status"])
            .limit(10)
            .offset(20)
            .order_by(OrderBy::desc("orderDate"));
        assert_eq!(
            opts.field_list(),
            Some(&["orderNumber".to_string(), "status".to_string()][..])
        );
        assert_eq!(opts.limit, Some(10));
        assert_eq!(opts.offset, Some(20));
        assert_eq!(opts.order_by, vec![OrderBy::desc("orderDate")]);
    }

    #[test]
    fn test_request_id_of() {
        let ctx = Context::with_request_id("req-7");
        assert_eq!(Context::request_id_of(Some(&ctx)), "req-7");
        assert_eq!(Context::request_id_of(None), "-");
    }
}
