use application_wizard::{
    AppState, SubmissionServices, WizardConfig, build_router, build_wizard_graph,
    clients::{HttpApplicationsApi, JsonRpcLedger, JsonRpcWallet, PinataPinningService},
    create_flow_runner,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wizard_flow::{InMemorySessionStorage, SessionStorage};

/// Initialize tracing; `LOG_FORMAT=pretty` for development, JSON otherwise
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "application_wizard=debug,wizard_flow=debug,tower_http=debug".into());

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
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = WizardConfig::from_env()?;
    let http = reqwest::Client::new();

    let services = SubmissionServices {
        api: Arc::new(HttpApplicationsApi::new(
            http.clone(),
            &config.portal_api_url,
            config.portal_api_token.clone(),
        )),
        pinning: Arc::new(PinataPinningService::new(
            http.clone(),
            &config.pinata_api_url,
            &config.pinata_api_key,
            &config.pinata_secret_key,
        )),
        ledger: Arc::new(JsonRpcLedger::new(
            http.clone(),
            &config.ledger_rpc_url,
            &config.contract_address,
            config.receipt_poll_interval,
        )),
        shared_key: config.document_shared_key.clone(),
    };
    let wallet = Arc::new(JsonRpcWallet::new(http, &config.ledger_rpc_url));

    let session_storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
    let graph = build_wizard_graph(services, config.celebration);
    let app = build_router(AppState {
        flow_runner: create_flow_runner(graph, session_storage.clone()),
        session_storage,
        wallet,
    });

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!(
        addr = %listener.local_addr()?,
        portal_api = %config.portal_api_url,
        ledger_rpc = %config.ledger_rpc_url,
        "application wizard listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
