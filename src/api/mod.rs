//! HTTP API server
//!
//! Serves the speech passthrough endpoints under `/api`, health probes, and
//! optionally a static browser client.

pub mod health;
pub mod rate_limit;
pub mod speech;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::gateway::{FeedbackGenerator, Synthesizer, Transcriber};
use crate::providers::Providers;
use crate::{Error, Result};

/// Which upstream credentials the server holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CredentialStatus {
    /// `OpenAI` key present (transcription and feedback)
    pub openai: bool,
    /// `ElevenLabs` key and voice id present (synthesis)
    pub elevenlabs: bool,
}

/// Shared state for API handlers
pub struct ApiState {
    pub transcriber: Arc<dyn Transcriber>,
    pub feedback: Arc<dyn FeedbackGenerator>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub credentials: CredentialStatus,
    pub rate_limiter: Option<rate_limit::SharedLimiter>,
}

impl ApiState {
    /// State backed by the hosted provider clients
    #[must_use]
    pub fn from_providers(providers: &Providers) -> Self {
        Self {
            transcriber: providers.openai.clone(),
            feedback: providers.openai.clone(),
            synthesizer: providers.elevenlabs.clone(),
            credentials: CredentialStatus {
                openai: providers.openai.is_configured(),
                elevenlabs: providers.elevenlabs.is_configured(),
            },
            rate_limiter: None,
        }
    }

    /// Limit the whole API to `requests_per_minute`
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_minute: Option<u32>) -> Self {
        self.rate_limiter = requests_per_minute.map(rate_limit::create_limiter);
        self
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    host: String,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Create a server from handler state and the `[server]` settings
    #[must_use]
    pub fn new(state: ApiState, config: &ServerConfig) -> Self {
        let state = state.with_rate_limit(config.rate_limit_rpm);
        Self {
            state: Arc::new(state),
            host: config.host.clone(),
            port: config.port,
            static_dir: config.static_dir.clone(),
        }
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .nest("/api", speech::router(self.state.clone()))
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()));

        // Serve the browser client if configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir = ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        let router = router.layer(axum::middleware::from_fn_with_state(
            self.state.clone(),
            rate_limit::rate_limit_middleware,
        ));

        // CORS layer for cross-origin requests from a browser client
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        if !self.state.credentials.openai {
            tracing::warn!("no OpenAI key: /api/speech-to-text and /api/generate-feedback will fail");
        }
        if !self.state.credentials.elevenlabs {
            tracing::warn!("no ElevenLabs key or voice id: /api/text-to-speech will fail");
        }
        if self.state.rate_limiter.is_some() {
            tracing::info!("rate limiting active");
        }

        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind API server on {addr}: {e}")))?;

        tracing::info!(%addr, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(Error::Io)?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
