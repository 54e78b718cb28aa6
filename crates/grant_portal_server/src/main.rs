//! grant_portal_server: standalone REST server for the grant portal.
//!
//! See `config` for the environment variables it reads.

use std::sync::Arc;

use anyhow::Context;
use grant_portal_core::blob_store::LocalBlobStore;
use grant_portal_core::memory::MemoryStore;
use grant_portal_core::ports::PortalStore;
use grant_portal_core::users::InMemoryRoleDirectory;
use grant_portal_core::PortalService;
use grant_portal_postgres::{initialize_schema, PgPortalStore};
use grant_portal_server::config::ServerConfig;
use grant_portal_server::router::build_router;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,grant_portal_server=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let store: Arc<dyn PortalStore> = match &config.database_url {
        Some(url) => {
            let store = PgPortalStore::connect(url).await?;
            initialize_schema(store.pool()).await?;
            tracing::info!("Connected to database");
            Arc::new(store)
        }
        None => {
            tracing::warn!("GRANT_PORTAL_DATABASE_URL not set; using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    tokio::fs::create_dir_all(&config.blob_root)
        .await
        .with_context(|| format!("creating blob root {}", config.blob_root.display()))?;
    let blobs = Arc::new(LocalBlobStore::new(&config.blob_root));

    let service = Arc::new(PortalService::new(
        store,
        blobs,
        Arc::new(InMemoryRoleDirectory::new()),
        config.policy.clone(),
    ));
    tracing::info!(
        stage_policy = ?service.policy().stage_policy,
        allow_dual_role = service.policy().allow_dual_role,
        "policy loaded"
    );

    let app = build_router(service);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("grant_portal_server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
