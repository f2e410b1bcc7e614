use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use company_context::config::config;
use company_context::context::TenantContext;
use company_context::directory;
use company_context::identity::IdentitySource;
use company_context::server::{self, AppState};
use company_context::storage::FileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up SUPABASE_URL, DATABASE_URL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config();
    tracing::info!("Starting company context bridge in {:?} mode", config.environment);

    let directory = directory::connect(&config.directory).await?;
    tracing::info!("Tenant directory: {}", directory.name());

    let state_dir = config.selection.state_dir()?;
    let store = FileStore::in_dir(&state_dir)?;
    tracing::info!("Selection persisted at {}", store.path().display());

    let context = Arc::new(
        TenantContext::new(directory, Arc::new(store)).with_selection_key(config.selection.selection_key()),
    );
    let identities = Arc::new(IdentitySource::new());
    let subscription = context.follow(&identities);

    let state = AppState {
        context: Arc::clone(&context),
        identities,
        auth: config.auth.clone(),
    };
    let app = server::app(state, &config.server);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("Company context bridge listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    subscription.stop();
    context.shutdown();

    Ok(())
}
