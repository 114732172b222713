use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use folio_core::{
    AgentDefinition, FileSessionService, InMemorySessionService, LlmRunner, SessionService,
};
use folio_llm::LlmClient;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::apis;
use crate::relay::MessageRelay;

/// Server configuration, read from the environment
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// URL advertised in the A2A agent card
    pub a2a_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            a2a_url: "http://localhost:8000/a2a".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("FOLIO_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match std::env::var("FOLIO_PORT") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("FOLIO_PORT is not a valid port: {}", raw))?,
            Err(_) => 8000,
        };
        let a2a_url = std::env::var("FOLIO_A2A_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}/a2a", port));
        Ok(Self { host, port, a2a_url })
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub relay: Arc<MessageRelay>,
    pub agent_name: Arc<str>,
    pub agent_description: Arc<str>,
}

impl ServerState {
    pub fn new(relay: Arc<MessageRelay>, agent_description: &str) -> Self {
        let agent_name = Arc::from(relay.app_name());
        Self {
            relay,
            agent_name,
            agent_description: Arc::from(agent_description),
        }
    }
}

/// Routes plus the A2A mount; a failing A2A setup only costs the `/a2a` routes
pub fn build_router(state: ServerState, config: &ServerConfig) -> Router {
    let mut app = Router::new()
        .route("/health", get(apis::health::health_check))
        .route("/sessions", post(apis::agent::create_session))
        .route("/run", post(apis::agent::run_agent))
        .route("/run_sse", post(apis::agent::run_agent_sse))
        .with_state(state.clone());

    match apis::a2a::router(state.relay.clone(), &state.agent_description, &config.a2a_url) {
        Ok(a2a) => {
            info!("A2A endpoints mounted at /a2a");
            app = app.nest("/a2a", a2a);
        }
        Err(e) => warn!("A2A endpoints not available: {}", e),
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

fn session_service() -> Arc<dyn SessionService> {
    if FileSessionService::is_enabled() {
        let folder = FileSessionService::folder_from_env();
        info!("Sessions persisted to {}", folder.display());
        Arc::new(FileSessionService::new(folder))
    } else {
        Arc::new(InMemorySessionService::new())
    }
}

pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let agent = Arc::new(AgentDefinition::from_env());
    let llm = LlmClient::ollama_from_env();

    info!("Starting agent server: {}", agent.name);
    info!(
        "Ollama API Base: {}",
        std::env::var("OLLAMA_API_BASE").unwrap_or_else(|_| "not set".to_string())
    );

    let sessions = session_service();
    let runner = Arc::new(LlmRunner::new(agent.clone(), sessions.clone(), llm));
    let relay = Arc::new(MessageRelay::new(sessions, runner));
    let state = ServerState::new(relay, &agent.description);

    let app = build_router(state, &config);

    let address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    info!("Listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down agent server");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
