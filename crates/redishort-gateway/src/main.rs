mod cli;

use crate::cli::{StorageBackendArg, CLI};
use clap::Parser;
use redishort_cache::{CacheConfig, ScoredCache};
use redishort_core::{LinkStore, SystemClock};
use redishort_gateway::{App, AppState};
use redishort_generator::{Base62Generator, GeneratorSettings};
use redishort_redirector::{RedirectorService, ResolverConfig};
use redishort_shortener::{ShortenerConfig, ShortenerService};
use redishort_storage::{InMemoryLinkStore, MySqlLinkStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CLI::try_parse()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(
        listen_addr = %config.listen_addr,
        public_base_url = %config.public_base_url,
        cache_limit = config.cache_limit,
        storage_backend = %config.storage,
        "starting redishort gateway"
    );

    match config.storage {
        StorageBackendArg::InMemory => {
            run_server(&config, InMemoryLinkStore::new()).await?;
        }
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .ok_or("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlLinkStore::connect(mysql_dsn).await?;
            run_server(&config, store).await?;
        }
    }

    Ok(())
}

async fn run_server<S: LinkStore>(config: &CLI, store: S) -> std::io::Result<()> {
    let store = Arc::new(store);
    let cache = Arc::new(ScoredCache::from(
        CacheConfig::builder().capacity(config.cache_limit).build(),
    ));

    let redirector = RedirectorService::with_config(
        store.clone(),
        cache.clone(),
        SystemClock,
        ResolverConfig::builder()
            .visit_timeout(Duration::from_millis(config.visit_timeout_ms))
            .build(),
    );
    let generator = Base62Generator::new(
        GeneratorSettings::builder()
            .disambiguator(config.disambiguator.into())
            .build(),
    );
    info!(disambiguator = ?generator.disambiguator(), "code generator ready");

    let shortener = ShortenerService::new(
        store,
        generator,
        ShortenerConfig::builder()
            .public_base_url(config.public_base_url.clone())
            .build(),
    );

    let state = AppState::new(Arc::new(redirector), Arc::new(shortener), cache);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "gateway listening");

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
