mod api;
mod config;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// Internal imports
use crate::api::{ActorsRequest, ApiError, RunRequest, RunResponse, SchemaRequest};
use crate::config::GatewayConfig;
use actor_core::{ActorService, ApifyClient, InputGenerator, ResolvedInput, Synthesizer};

// 1. Application State
// One service shared by every request; each request brings its own credential.
#[derive(Clone)]
struct AppState {
    service: Arc<ActorService>,
    shutdown: CancellationToken,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 2. Logging Setup
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    info!("Actor Gateway Initializing...");
    let config = GatewayConfig::from_env()?;

    // 3. Platform Client
    let platform = ApifyClient::new(&config.platform_base, config.platform_timeout)
        .context("Failed to build platform HTTP client")?;
    info!("Platform API: {}", config.platform_base);

    // 4. Generative fallback (optional)
    let generator: Option<Arc<dyn InputGenerator>> = match &config.openai_api_key {
        Some(key) => {
            let synth = Synthesizer::new(
                key,
                &config.openai_model,
                config.openai_api_base.as_deref(),
            );
            // Quick connectivity check
            match synth.ping().await {
                Ok(msg) => info!("Synthesizer Status: {}", msg),
                Err(e) => error!("Synthesizer is configured but unresponsive: {}", e),
            }
            Some(Arc::new(synth) as Arc<dyn InputGenerator>)
        }
        None => {
            warn!("OPENAI_API_KEY not set; generated input fallback disabled");
            None
        }
    };

    // 5. Bundle State
    let shutdown = CancellationToken::new();
    let state = AppState {
        service: Arc::new(ActorService::new(
            Arc::new(platform),
            generator,
            config.run_policy.clone(),
        )),
        shutdown: shutdown.clone(),
    };

    // 6. Define Routes
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/actors", post(list_actors))
        .route("/api/schema", post(resolve_schema))
        .route("/api/run", post(run_actor))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // 7. Start Server
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Gateway listening on {}...", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("Server error")?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown requested, releasing pending runs...");
    shutdown.cancel();
}

// --- HANDLERS ---

async fn health_check() -> &'static str {
    "Actor Gateway: Operational"
}

async fn list_actors(
    State(state): State<AppState>,
    payload: Result<Json<ActorsRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload?;
    let actors = state.service.list_actors(payload.api_key.as_deref()).await?;
    Ok(Json(actors))
}

async fn resolve_schema(
    State(state): State<AppState>,
    payload: Result<Json<SchemaRequest>, JsonRejection>,
) -> Result<Json<ResolvedInput>, ApiError> {
    let Json(payload) = payload?;
    let resolved = state
        .service
        .resolve_schema(payload.api_key.as_deref(), payload.actor_id.as_deref())
        .await?;
    Ok(Json(resolved))
}

async fn run_actor(
    State(state): State<AppState>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Json<RunResponse>, ApiError> {
    let Json(payload) = payload?;
    // A dropped connection drops this future; the remote run is left alone.
    let cancel = state.shutdown.child_token();

    let outcome = state
        .service
        .run_actor(
            payload.api_key.as_deref(),
            payload.actor_id.as_deref(),
            payload.input,
            &cancel,
        )
        .await?;

    Ok(Json(RunResponse {
        run_id: outcome.run.id,
        result: outcome.items,
    }))
}
