use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use datatable::{Context, DataTable, FindOptions, Record, TableError, Template, Value};
use datatable_sqlx::Backend;
use serde_json::json;

use crate::error::ApiError;
use crate::state::AppState;

const INDEX_HTML: &str = "<html>\n<head> <title>W4111 GoT</title> </head>\n<body>\
    <p>Hello World!</p>\n\
    <p><em>Hint</em>: This is a RESTful web service! Append a username \
    to the URL. The routes /health and /demo do interesting things.</p>\n\
    </body>\n</html>";

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router<DB: Backend>(state: AppState<DB>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/demo", get(demo).post(demo))
        .route("/api/demo/{parameter}", get(demo_parameter).post(demo_parameter))
        .route("/api/{db}/{table}", get(list::<DB>).post(create::<DB>))
        .route(
            "/api/{db}/{table}/{key}",
            get(fetch_one::<DB>).put(update::<DB>).delete(remove::<DB>),
        )
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "time": chrono::Utc::now().to_rfc3339() }))
}

async fn demo(
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
    body: Bytes,
) -> Json<serde_json::Value> {
    echo_inputs(method, uri, None, headers, query, body)
}

async fn demo_parameter(
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(parameter): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
    body: Bytes,
) -> Json<serde_json::Value> {
    echo_inputs(method, uri, Some(parameter), headers, query, body)
}

/// Everything the demo routes extracted from the request, echoed back.
fn echo_inputs(
    method: Method,
    uri: Uri,
    parameter: Option<String>,
    headers: HeaderMap,
    mut query: BTreeMap<String, String>,
    body: Bytes,
) -> Json<serde_json::Value> {
    let field_list = query
        .remove("fields")
        .map(|fields| split_list(&fields));
    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            json!("You sent something but I could not get JSON out of it.")
        })
    };
    let inputs = json!({
        "path": uri.path(),
        "method": method.as_str(),
        "path_params": { "parameter": parameter },
        "query_params": query,
        "headers": headers,
        "body": body,
        "field_list": field_list,
    });
    tracing::debug!(inputs = %inputs, "demo inputs");
    Json(json!({ "/demo received the following inputs": inputs }))
}

async fn list<DB: Backend>(
    State(state): State<AppState<DB>>,
    Path((db, table)): Path<(String, String)>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    let (template, options) = parse_query(query)?;
    let ctx = context(&headers);
    let rows = state
        .table(&db, &table)
        .await?
        .find_by_template(&template, &options, Some(&ctx))
        .await?;
    Ok(Json(
        rows.into_iter()
            .map(|row| state.links.augment(&db, &table, row))
            .collect(),
    ))
}

async fn fetch_one<DB: Backend>(
    State(state): State<AppState<DB>>,
    Path((db, table, key)): Path<(String, String, String)>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let fields = query.get("fields").map(|f| split_list(f));
    let ctx = context(&headers);
    let row = state
        .table(&db, &table)
        .await?
        .find_by_primary_key(&key_values(&key), fields.as_deref(), Some(&ctx))
        .await?
        .ok_or_else(|| TableError::not_found(format!("no record with key '{key}' in {db}.{table}")))?;
    Ok(Json(state.links.augment(&db, &table, row)))
}

async fn create<DB: Backend>(
    State(state): State<AppState<DB>>,
    Path((db, table)): Path<(String, String)>,
    headers: HeaderMap,
    Json(record): Json<Record>,
) -> Result<Response, ApiError> {
    let ctx = context(&headers);
    state
        .table(&db, &table)
        .await?
        .insert(&record, Some(&ctx))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(state.links.augment(&db, &table, record)),
    )
        .into_response())
}

async fn update<DB: Backend>(
    State(state): State<AppState<DB>>,
    Path((db, table, key)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(new_values): Json<Record>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ctx = context(&headers);
    let updated = state
        .table(&db, &table)
        .await?
        .update_by_key(&key_values(&key), &new_values, Some(&ctx))
        .await?;
    affected(updated, &db, &table, &key)
}

async fn remove<DB: Backend>(
    State(state): State<AppState<DB>>,
    Path((db, table, key)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ctx = context(&headers);
    let deleted = state
        .table(&db, &table)
        .await?
        .delete_by_key(&key_values(&key), Some(&ctx))
        .await?;
    affected(deleted, &db, &table, &key)
}

fn affected(count: u64, db: &str, table: &str, key: &str) -> Result<Json<serde_json::Value>, ApiError> {
    if count == 0 {
        return Err(TableError::not_found(format!("no record with key '{key}' in {db}.{table}")).into());
    }
    Ok(Json(json!({ "rows_affected": count })))
}

/// Split query parameters into the template and the find refinements
/// (`fields`, `limit`, `offset`).
fn parse_query(mut query: BTreeMap<String, String>) -> Result<(Template, FindOptions), TableError> {
    let mut options = FindOptions::default();
    if let Some(fields) = query.remove("fields") {
        options.fields = Some(split_list(&fields));
    }
    if let Some(limit) = query.remove("limit") {
        options.limit = Some(parse_count("limit", &limit)?);
    }
    if let Some(offset) = query.remove("offset") {
        options.offset = Some(parse_count("offset", &offset)?);
    }
    let template = query
        .into_iter()
        .map(|(field, value)| (field, Value::Text(value)))
        .collect();
    Ok((template, options))
}

fn parse_count(name: &str, raw: &str) -> Result<u64, TableError> {
    raw.parse()
        .map_err(|_| TableError::invalid_argument(format!("{name} must be a non-negative integer, got '{raw}'")))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn key_values(raw: &str) -> Vec<Value> {
    raw.split(',').map(|part| Value::Text(part.to_string())).collect()
}

/// The caller's `x-request-id`, or a fresh one.
fn context(headers: &HeaderMap) -> Context {
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    Context::with_request_id(request_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let query: BTreeMap<String, String> = [
            ("status", "Shipped"),
            ("fields", "orderNumber, status"),
            ("limit", "10"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let (template, options) = parse_query(query).unwrap();
        assert_eq!(template, datatable::template([("status", "Shipped")]));
        assert_eq!(
            options,
            FindOptions::default().fields(["orderNumber", "status"]).limit(10)
        );
    }

    #[test]
    fn test_bad_limit() {
        let query = BTreeMap::from([("limit".to_string(), "ten".to_string())]);
        assert!(parse_query(query).is_err());
    }

    #[test]
    fn test_key_values() {
        assert_eq!(
            key_values("10100,S18_1749"),
            vec![Value::from("10100"), Value::from("S18_1749")]
        );
    }
}
