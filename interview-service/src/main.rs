use interview_service::config::InterviewConfig;
use interview_service::services::init_metrics;
use interview_service::startup::Application;
use service_core::error::AppError;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = InterviewConfig::load()?;

    init_tracing(
        "interview-service",
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    // Recorder must exist before the first metric is emitted
    init_metrics();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        store = ?config.store.backend,
        provider = ?config.genai.provider,
        "Starting interview service"
    );

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        e
    })?;

    application.run_until_stopped().await?;
    tracing::info!("Interview service stopped");
    Ok(())
}
