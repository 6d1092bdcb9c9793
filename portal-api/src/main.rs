use portal_api::{
    ApiConfig, AppState, DocumentStore, InMemoryDocumentStore, PostgresDocumentStore,
    build_router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "portal_api=debug,tower_http=debug,sqlx=warn".into());

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_target(true))
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ApiConfig::from_env()?;

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            info!("using postgres document store");
            Arc::new(PostgresDocumentStore::connect(url).await?)
        }
        None => {
            warn!("DATABASE_URL not set, records are kept in memory only");
            Arc::new(InMemoryDocumentStore::new())
        }
    };

    let app = build_router(AppState {
        store,
        api_tokens: Arc::new(config.api_tokens),
    });

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!(addr = %listener.local_addr()?, "portal api listening");

    axum::serve(listener, app).await?;
    Ok(())
}
