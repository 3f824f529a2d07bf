use crate::config::{IdentityBackend, InterviewConfig, ProviderKind, StoreBackend};
use crate::handlers::{self, EvaluationHandler, QuestionsHandler, SignupHandler};
use crate::services::providers::{GeminiConfig, GeminiTextProvider, MockTextProvider, TextProvider};
use crate::services::{
    AccessPolicy, AuthServiceIdentityProvider, DocumentStore, GroupPolicy, IdentityProvider,
    InMemoryDocumentStore, InMemoryIdentityProvider, Metrics, MetricsSink, MongoDb,
    MongoDocumentStore, PrometheusSink, QuestionRepository,
};
use axum::{middleware, routing::get, Router};
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub metrics: Metrics,
    pub questions: QuestionsHandler,
    pub evaluation: EvaluationHandler,
    pub signup: SignupHandler,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        policy: Arc<dyn AccessPolicy>,
        metrics: Metrics,
        provider: Arc<dyn TextProvider>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let repository = QuestionRepository::new(store.clone());
        Self {
            questions: QuestionsHandler::new(repository, policy, metrics.clone()),
            evaluation: EvaluationHandler::new(provider, metrics.clone()),
            signup: SignupHandler::new(identity),
            store,
            metrics,
        }
    }

    /// Wire every collaborator from configuration.
    pub async fn from_config(config: &InterviewConfig) -> Result<Self, AppError> {
        let store: Arc<dyn DocumentStore> = match config.store.backend {
            StoreBackend::Mongo => {
                let uri = config.store.mongodb_uri.as_deref().ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!("MONGODB_URI is required"))
                })?;
                let db = MongoDb::connect(uri, &config.store.database).await?;
                let store = MongoDocumentStore::new(
                    db,
                    &config.store.questions_collection,
                    config.store.page_size,
                );
                store.initialize_indexes().await.map_err(|e| {
                    tracing::error!("Failed to initialize database indexes: {}", e);
                    e
                })?;
                Arc::new(store)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory document store; data is not persisted");
                Arc::new(InMemoryDocumentStore::new(config.store.page_size))
            }
        };

        let provider: Arc<dyn TextProvider> = match config.genai.provider {
            ProviderKind::Gemini => Arc::new(
                GeminiTextProvider::new(GeminiConfig {
                    api_key: config.genai.api_key.clone().unwrap_or_default(),
                    model: config.genai.text_model.clone(),
                })
                .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?,
            ),
            ProviderKind::Mock => Arc::new(MockTextProvider::new()),
        };

        let identity: Arc<dyn IdentityProvider> = match config.identity.backend {
            IdentityBackend::AuthService => {
                let url = config.identity.auth_service_url.clone().ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!("AUTH_SERVICE_URL is required"))
                })?;
                Arc::new(AuthServiceIdentityProvider::new(
                    url,
                    config.identity.admin_api_key.clone(),
                ))
            }
            IdentityBackend::Memory => Arc::new(InMemoryIdentityProvider::new()),
        };

        let sink: Arc<dyn MetricsSink> = Arc::new(PrometheusSink);
        let metrics = Metrics::new(sink, config.metrics.namespace.clone());
        let policy: Arc<dyn AccessPolicy> = Arc::new(GroupPolicy::new(&config.auth.admin_group));

        let mut state = Self::new(store, policy, metrics, provider, identity);
        state.evaluation = state.evaluation.with_max_tokens(config.genai.max_tokens);
        Ok(state)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .fallback(handlers::envelope_handler)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: InterviewConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(&config).await?;
        Self::with_state(state, config.common.port).await
    }

    /// Serve pre-built state on `port` (0 picks a free port).
    pub async fn with_state(state: AppState, port: u16) -> Result<Self, AppError> {
        state.metrics.cold_start();

        let app = router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
