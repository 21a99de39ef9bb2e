//! # topic-board binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::AppState;
use auth_adapters::RolePolicy;
use configs::{LogFormat, LogSettings, Settings};
use domains::{ActorResolver, ProfileDirectory, SystemClock, TopicStore};
use services::{ForumService, RankingPolicy};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "db-postgres")]
use storage_adapters::{PgProfileDirectory, PgTopicStore};
#[cfg(not(feature = "db-postgres"))]
use storage_adapters::{MemoryProfileDirectory, MemoryTopicStore};

#[cfg(feature = "auth-jwt")]
use auth_adapters::JwtActorResolver;
#[cfg(not(feature = "auth-jwt"))]
use auth_adapters::AnonymousResolver;

#[cfg(any(feature = "db-postgres", feature = "auth-jwt"))]
use secrecy::ExposeSecret;

#[cfg(not(feature = "web-axum"))]
compile_error!("topic-board needs a transport: enable the `web-axum` feature");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.log);

    // 1. Storage and identity
    let (store, profiles) = build_storage(&settings).await?;
    let actors = build_actor_resolver(&settings)?;

    // 2. Ranking allow-list, fixed for the life of the process
    let ranking = RankingPolicy::new(settings.ranking.gravity_groups.iter().copied());
    info!(gravity_groups = ?settings.ranking.gravity_groups, "ranking policy loaded");

    // 3. Services
    let forum = ForumService::new(
        store,
        Arc::new(RolePolicy),
        profiles,
        Arc::new(SystemClock),
        ranking,
    )
    .with_max_page_limit(settings.pagination.max_limit);

    let state = AppState {
        forum: Arc::new(forum),
        actors,
        default_limit: settings.pagination.default_limit,
    };

    // 4. Transport
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "topic-board listening");

    axum::serve(listener, api_adapters::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

#[cfg(feature = "db-postgres")]
async fn build_storage(
    settings: &Settings,
) -> anyhow::Result<(Arc<dyn TopicStore>, Arc<dyn ProfileDirectory>)> {
    let store = PgTopicStore::connect(
        settings.database.url.expose_secret(),
        settings.database.max_connections,
    )
    .await
    .context("connecting to postgres")?;
    store.migrate().await?;

    let profiles = PgProfileDirectory::new(store.pool().clone());
    Ok((Arc::new(store), Arc::new(profiles)))
}

#[cfg(not(feature = "db-postgres"))]
async fn build_storage(
    _settings: &Settings,
) -> anyhow::Result<(Arc<dyn TopicStore>, Arc<dyn ProfileDirectory>)> {
    warn!("db-postgres disabled: topics live in memory and are lost on exit");
    Ok((Arc::new(MemoryTopicStore::new()), Arc::new(MemoryProfileDirectory::new())))
}

#[cfg(feature = "auth-jwt")]
fn build_actor_resolver(settings: &Settings) -> anyhow::Result<Arc<dyn ActorResolver>> {
    let secret = settings.auth.jwt_secret.expose_secret();
    anyhow::ensure!(!secret.is_empty(), "auth.jwt_secret must be set when auth-jwt is enabled");
    Ok(Arc::new(JwtActorResolver::new(secret.as_bytes())))
}

#[cfg(not(feature = "auth-jwt"))]
fn build_actor_resolver(_settings: &Settings) -> anyhow::Result<Arc<dyn ActorResolver>> {
    warn!("auth-jwt disabled: every request is served as a guest");
    Ok(Arc::new(AnonymousResolver))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
