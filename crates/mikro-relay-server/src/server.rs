use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    auth::require_sync_key,
    config::ServerConfig,
    handlers::{env_test, get_all_products, get_product, health},
    hash::SystemClock,
    mikro::{probe_login, MikroClient},
    AppState,
};

/// Routes with state attached, without CORS or tracing layers.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/getProduct", post(get_product))
        .route("/env-test", get(env_test));

    // Sync key required if configured.
    let protected = Router::new()
        .route("/getAllProducts", post(get_all_products))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_sync_key,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(state)
}

pub async fn run(cfg: ServerConfig) -> Result<()> {
    let mikro = MikroClient::new(cfg.upstream, Arc::new(SystemClock))
        .context("build Mikro HTTP client")?;

    if !mikro.hasher().has_secret() {
        warn!("SIFRE not set; daily hash falls back to the literal \"undefined\"");
    }
    if cfg.sync_key.is_none() {
        warn!("SECRET_SYNC_KEY not set; /getAllProducts is open to any caller");
    }

    let state = AppState {
        mikro,
        sync_key: cfg.sync_key,
    };

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind listener")?;

    serve(listener, state, cfg.cors_origins.as_deref()).await
}

/// Serves the relay on an already bound listener. The APILogin check is
/// spawned in the background and its outcome never stops serving.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: AppState,
    cors_origins: Option<&str>,
) -> Result<()> {
    let addr = listener.local_addr().context("listener address")?;
    info!(%addr, "mikro relay listening");
    info!("product lookup: POST http://{addr}/getProduct");
    info!("bulk sync (protected): POST http://{addr}/getAllProducts");

    spawn_login_probe(state.mikro.clone());

    let app = router(state)
        .layer(build_cors(cors_origins))
        .layer(TraceLayer::new_for_http());

    axum::serve(listener, app).await.context("server error")
}

pub fn spawn_login_probe(client: MikroClient) -> JoinHandle<bool> {
    tokio::spawn(async move { probe_login(&client).await })
}

fn build_cors(origins: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::OPTIONS])
        .allow_headers(Any);

    match origins {
        Some(o) => {
            let origins: Vec<_> = o
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            cors.allow_origin(origins)
        }
        None => cors.allow_origin(Any),
    }
}

