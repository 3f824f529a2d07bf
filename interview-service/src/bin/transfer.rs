//! Copies every question from one collection to another.

use interview_service::config::TransferConfig;
use interview_service::services::{
    transfer_items, MongoDb, MongoDocumentStore, TransferPolicy,
};
use service_core::error::AppError;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = TransferConfig::load()?;
    init_tracing("interview-transfer", &config.log_level, None);

    let source_db = MongoDb::connect(&config.source.uri, &config.source.database).await?;
    let destination_db =
        MongoDb::connect(&config.destination.uri, &config.destination.database).await?;

    let policy = TransferPolicy {
        batch_size: config.batch_size,
        max_retries: config.max_retries,
        ..Default::default()
    };
    let source = MongoDocumentStore::new(source_db, &config.source.collection, 100);
    let destination = MongoDocumentStore::new(
        destination_db,
        &config.destination.collection,
        policy.batch_size,
    );

    tracing::info!(
        source = %config.source.collection,
        destination = %config.destination.collection,
        batch_size = policy.batch_size,
        "Starting transfer"
    );

    let report = transfer_items(&source, &destination, &policy).await?;

    println!(
        "Transfer complete: {} scanned, {} written, {} failed",
        report.scanned, report.written, report.failed
    );

    if report.failed > 0 {
        return Err(AppError::InternalError(anyhow::anyhow!(
            "{} items could not be transferred",
            report.failed
        )));
    }
    Ok(())
}
