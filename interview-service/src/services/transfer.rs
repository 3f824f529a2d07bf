//! Bulk copy of every item from one document store into another.

use super::store::DocumentStore;
use crate::models::Item;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use service_core::error::AppError;
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TransferPolicy {
    pub batch_size: usize,
    /// Retries of a batch's unprocessed items before they count as failed.
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            batch_size: 25,
            max_retries: 5,
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(32),
        }
    }
}

impl TransferPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: self.max_interval,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub scanned: usize,
    pub written: usize,
    pub failed: usize,
}

/// Scan `source` page by page and write everything to `destination` in
/// batches. A scan failure aborts the transfer; write failures only count
/// against the report.
pub async fn transfer_items(
    source: &dyn DocumentStore,
    destination: &dyn DocumentStore,
    policy: &TransferPolicy,
) -> Result<TransferReport, AppError> {
    let batch_size = policy.batch_size.max(1);
    let mut report = TransferReport::default();
    let mut buffer: Vec<Item> = Vec::with_capacity(batch_size);
    let mut start_key: Option<String> = None;
    let mut seen_tokens: HashSet<String> = HashSet::new();

    loop {
        let page = source.scan(start_key.as_deref()).await?;
        report.scanned += page.items.len();
        buffer.extend(page.items);

        while buffer.len() >= batch_size {
            let batch: Vec<Item> = buffer.drain(..batch_size).collect();
            write_batch(destination, batch, policy, &mut report).await;
        }

        match page.last_evaluated_key {
            Some(token) if seen_tokens.insert(token.clone()) => start_key = Some(token),
            Some(token) => {
                return Err(AppError::dependency(anyhow::anyhow!(
                    "Source store repeated continuation token {}",
                    token
                )));
            }
            None => break,
        }
    }

    if !buffer.is_empty() {
        write_batch(destination, buffer, policy, &mut report).await;
    }

    tracing::info!(
        scanned = report.scanned,
        written = report.written,
        failed = report.failed,
        "Transfer complete"
    );
    Ok(report)
}

async fn write_batch(
    destination: &dyn DocumentStore,
    batch: Vec<Item>,
    policy: &TransferPolicy,
    report: &mut TransferReport,
) {
    let mut pending = batch;
    let mut backoff = policy.backoff();
    let mut retries = 0;

    loop {
        let attempted = pending.len();
        match destination.batch_put(pending).await {
            Ok(unprocessed) => {
                report.written += attempted - unprocessed.len();
                if unprocessed.is_empty() {
                    return;
                }
                if retries >= policy.max_retries {
                    tracing::warn!(
                        count = unprocessed.len(),
                        retries,
                        "Giving up on unprocessed items"
                    );
                    report.failed += unprocessed.len();
                    return;
                }

                retries += 1;
                let delay = backoff.next_backoff().unwrap_or(policy.max_interval);
                tracing::debug!(
                    count = unprocessed.len(),
                    retry = retries,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying unprocessed items"
                );
                tokio::time::sleep(delay).await;
                pending = unprocessed;
            }
            Err(e) => {
                tracing::error!(error = %e, count = attempted, "Batch write failed");
                report.failed += attempted;
                return;
            }
        }
    }
}
