//! # datatable-server — REST front end over `datatable` tables
//!
//! | Route | Methods |
//! |-------|---------|
//! | `/` | `GET` greeting |
//! | `/health` | `GET` liveness and server time |
//! | `/api/demo[/{parameter}]` | `GET`, `POST` echo of the request inputs |
//! | `/api/{db}/{table}` | `GET` find by query template, `POST` insert |
//! | `/api/{db}/{table}/{key}` | `GET`, `PUT`, `DELETE` by primary key |

pub mod config;
pub mod error;
pub mod layers;
pub mod links;
pub mod routes;
pub mod state;

use axum::{middleware, Router};
use datatable_sqlx::Backend;

pub use config::{Driver, ServerConfig};
pub use error::ApiError;
pub use links::{Link, LinkRule, LinkRules};
pub use state::AppState;

/// The full application: routes plus logging, tracing and panic layers.
pub fn app<DB: Backend>(state: AppState<DB>) -> Router {
    routes::router(state)
        .layer(middleware::from_fn(layers::log_exchange))
        .layer(layers::default_trace())
        .layer(layers::catch_panic_layer())
}
