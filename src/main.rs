use tasklist::{
    application::task_service::TaskServiceImpl,
    config::Config,
    http::routing::{self, tasks},
    infrastructure::store::TaskStore,
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    telemetry::init(&config.log_filter, config.log_file.as_deref())?;

    let store = TaskStore::new(&config.database_url);
    let repo = store.repository().await?.clone();
    let service = TaskServiceImpl::load(repo).await?;
    let router = routing::app(tasks::router(tasks::AppState { service }));

    let addr = config.bind_addr;
    tracing::info!(%addr, database_url = %config.database_url, "listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::ctrl_c;
    let _ = ctrl_c().await;
    tracing::info!("shutdown");
}
