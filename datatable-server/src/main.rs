use datatable::DataTableConfig;
use datatable_server::{app, layers, AppState, Driver, LinkRules, ServerConfig};
use datatable_sqlx::Backend;
use sqlx::{MySql, Sqlite};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    layers::init_tracing();

    let profile = std::env::var("DATATABLE_PROFILE").unwrap_or_else(|_| "dev".to_string());
    let config = ServerConfig::from_config(&DataTableConfig::load(&profile)?)?;
    tracing::info!(addr = %config.addr, driver = ?config.driver, store = %config.connect.store_id(), "starting server");

    match config.driver {
        Driver::Sqlite => serve::<Sqlite>(config).await,
        Driver::MySql => serve::<MySql>(config).await,
    }
}

async fn serve<DB: Backend>(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::<DB>::new(config.connect, config.pool, LinkRules::defaults());
    let connections = state.connections.clone();

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    connections.close_all().await;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
