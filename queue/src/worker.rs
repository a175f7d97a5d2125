//! C10 — Generation Worker
//!
//! Bounded-concurrency consumer loop, grounded on the teacher's
//! `edge-server::orders::archive_worker::ArchiveWorker`: a `Semaphore`
//! caps in-flight work, each delivery is handled in its own spawned
//! task, and blocking failures are logged rather than allowed to kill
//! the loop.

use std::sync::Arc;

use certs::CertificateEngine;
use futures::StreamExt;
use lapin::{Channel, Consumer};
use shared::error::AppError;
use tenant::{TenantContext, TenantSchema};
use tokio::sync::Semaphore;

use crate::delivery::Delivery;

pub struct GenerationWorker {
    engine: Arc<CertificateEngine>,
    semaphore: Arc<Semaphore>,
    channel: Channel,
}

impl GenerationWorker {
    pub fn new(engine: Arc<CertificateEngine>, channel: Channel, concurrency: usize) -> Self {
        Self { engine, semaphore: Arc::new(Semaphore::new(concurrency.max(1))), channel }
    }

    pub async fn run(self: Arc<Self>, mut consumer: Consumer) {
        tracing::info!("generation worker started");
        while let Some(delivery) = consumer.next().await {
            let raw = match delivery {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::error!(error = %e, "failed to read queue delivery");
                    continue;
                }
            };

            let worker = self.clone();
            tokio::spawn(async move {
                let _permit = worker.semaphore.acquire().await.expect("semaphore never closed");
                match Delivery::decode(raw) {
                    Ok(delivery) => worker.handle(delivery).await,
                    Err(e) => tracing::error!(error = %e, "dropping undecodable queue delivery"),
                }
            });
        }
        tracing::info!("generation worker consumer stream closed");
    }

    /// One delivery, start to finish. The `TenantContext` built here is a
    /// plain local value — it is never ambient, so "clearing" it on exit
    /// is automatic: it is dropped at the end of this function regardless
    /// of which branch returns.
    async fn handle(&self, delivery: Delivery) {
        let certificate_id = delivery.message.certificate_id;
        let is_preview = delivery.message.is_preview;

        let schema = match TenantSchema::parse(delivery.message.tenant_schema.clone()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(certificate_id, error = %e, "invalid tenant schema in queue message, dropping");
                let _ = delivery.ack().await;
                return;
            }
        };
        let tenant = TenantContext::bound(schema);

        match self.engine.process(&tenant, certificate_id, is_preview).await {
            Ok(()) => {
                tracing::info!(certificate_id, "certificate generation succeeded");
                if let Err(e) = delivery.ack().await {
                    tracing::error!(certificate_id, error = %e, "failed to ack successful delivery");
                }
            }
            Err(err) => self.handle_failure(delivery, certificate_id, err).await,
        }
    }

    async fn handle_failure(&self, delivery: Delivery, certificate_id: i64, err: AppError) {
        if is_transient(&err) && !delivery.retry_budget_exhausted() {
            tracing::warn!(certificate_id, error = %err, delivery_count = delivery.delivery_count, "transient failure, sending to retry queue");
            if let Err(e) = delivery.nack_retry().await {
                tracing::error!(certificate_id, error = %e, "failed to nack delivery for retry");
            }
            return;
        }

        tracing::error!(certificate_id, error = %err, delivery_count = delivery.delivery_count, "generation failed permanently, marking FAILED");
        let schema = TenantSchema::parse(delivery.message.tenant_schema.clone());
        let Ok(schema) = schema else {
            let _ = delivery.dead_letter(&self.channel).await;
            return;
        };
        let tenant = TenantContext::bound(schema);

        match self.engine.mark_as_failed(&tenant, certificate_id, &err.message).await {
            Ok(()) => {
                if let Err(e) = delivery.dead_letter(&self.channel).await {
                    tracing::error!(certificate_id, error = %e, "failed to dead-letter delivery after marking FAILED");
                }
            }
            Err(e) => {
                tracing::error!(certificate_id, error = %e, "failed to persist FAILED status, dead-lettering anyway");
                let _ = delivery.dead_letter(&self.channel).await;
            }
        }
    }
}

/// Network/IO/DB connectivity failures are retried; validation and
/// not-found failures are permanent per SPEC_FULL.md §4.10.
fn is_transient(err: &AppError) -> bool {
    use shared::error::ErrorCode;
    matches!(err.code, ErrorCode::DatabaseError | ErrorCode::StorageTransient | ErrorCode::RenderFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::{AppError, ErrorCode};

    #[test]
    fn transient_failures_match_retryable_codes() {
        assert!(is_transient(&AppError::database("connection reset")));
        assert!(is_transient(&AppError::with_message(ErrorCode::StorageTransient, "timeout")));
    }

    #[test]
    fn permanent_failures_do_not_retry() {
        assert!(!is_transient(&AppError::validation("bad field")));
        assert!(!is_transient(&AppError::not_found("template")));
    }
}
