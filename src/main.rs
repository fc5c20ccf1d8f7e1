use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use movie_feed_api::{
    config::{Config, ProfileBackend},
    db::{
        create_pool, create_redis_client, run_migrations, Cache, MemoryStore, PgStore,
        PostgrestStore, ProfileStore,
    },
    routes::{create_router, AppState},
    services::{CatalogProvider, OmdbProvider, ProfileRepository},
};

async fn build_profile_store(config: &Config) -> anyhow::Result<Arc<dyn ProfileStore>> {
    let store: Arc<dyn ProfileStore> = match config.profile_backend {
        ProfileBackend::Postgrest => {
            let url = config
                .supabase_url
                .as_deref()
                .context("SUPABASE_URL is required for the postgrest profile backend")?;
            let key = config
                .supabase_key
                .clone()
                .context("SUPABASE_KEY is required for the postgrest profile backend")?;
            Arc::new(PostgrestStore::new(url, key))
        }
        ProfileBackend::Postgres => {
            let pool = create_pool(&config.database_url)
                .await
                .context("Failed to connect to Postgres")?;
            run_migrations(&pool).await.context("Failed to run migrations")?;
            Arc::new(PgStore::new(pool))
        }
        ProfileBackend::Memory => Arc::new(MemoryStore::new()),
    };

    tracing::info!(backend = store.name(), "Profile store ready");
    Ok(store)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("movie_feed_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let (cache, cache_writer) = match config.redis_url.as_deref() {
        Some(url) => {
            let (cache, writer) = Cache::new(create_redis_client(url)?);
            (Some(cache), Some(writer))
        }
        None => (None, None),
    };

    let catalog: Option<Arc<dyn CatalogProvider>> = match OmdbProvider::new(
        config.catalog_api_key(),
        config.omdb_api_url.clone(),
        config.catalog_timeout(),
        cache,
    ) {
        Ok(provider) => Some(Arc::new(provider)),
        Err(e) => {
            tracing::warn!(error = %e, "Catalog unavailable");
            None
        }
    };

    let mut profiles = ProfileRepository::new(build_profile_store(&config).await?);
    if let Some(catalog) = &catalog {
        profiles = profiles.with_catalog(catalog.clone());
    }

    let state = AppState::new(catalog, profiles, config.recommendation_target);
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    Ok(())
}
