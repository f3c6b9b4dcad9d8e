mod config;
mod db;
mod error;
mod routes;
mod seed;
mod state;
mod storage;
mod templates;
mod workflow;

use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "confreview=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;
    let config = Arc::new(config);

    crate::storage::ensure_dirs(&config.upload_folder)?;

    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(pool.as_ref()).await?;
    let store: Arc<dyn db::Store> = Arc::new(db::PgStore::new(pool));

    if config.seed_demo_data {
        seed::seed_demo_data(store.as_ref()).await?;
    }

    let templates = templates::load(config.template_dir.as_deref())?;

    let state = Arc::new(state::AppState {
        store,
        config: config.clone(),
        templates: Arc::new(templates),
    });

    let app = routes::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Conference review listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
