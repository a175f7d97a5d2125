//! C11 — Preview Sweeper
//!
//! Periodic task, grounded on `edge-server::orders::archive_worker`'s
//! `scan_interval` tick loop: enumerate tenants via C2, sweep each one's
//! aged previews via C8, log and continue past per-certificate errors.

use std::sync::Arc;
use std::time::Duration;

use certs::CertificateEngine;
use tenant::{TenantContext, TenantRegistry, TenantSchema};

pub struct PreviewSweeper {
    engine: Arc<CertificateEngine>,
    registry: Arc<TenantRegistry>,
    max_preview_age_minutes: i64,
}

impl PreviewSweeper {
    pub fn new(engine: Arc<CertificateEngine>, registry: Arc<TenantRegistry>, max_preview_age_minutes: i64) -> Self {
        Self { engine, registry, max_preview_age_minutes }
    }

    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            self.sweep_once().await;
        }
    }

    pub async fn sweep_once(&self) {
        let customers = match self.registry.list_active().await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "preview sweep: failed to list active tenants");
                return;
            }
        };

        for customer in customers {
            let schema = match TenantSchema::parse(customer.tenant_schema.clone()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(schema = %customer.tenant_schema, error = %e, "preview sweep: invalid schema name, skipping tenant");
                    continue;
                }
            };
            let tenant = TenantContext::bound(schema);
            let expired = match self.engine.list_expired_previews(&tenant, self.max_preview_age_minutes).await {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::error!(schema = %customer.tenant_schema, error = %e, "preview sweep: failed to list expired previews");
                    continue;
                }
            };

            for certificate_id in expired {
                if let Err(e) = self.engine.sweep_one(&tenant, certificate_id).await {
                    tracing::error!(
                        schema = %customer.tenant_schema,
                        certificate_id,
                        error = %e,
                        "preview sweep: failed to revoke expired preview, continuing"
                    );
                }
            }
        }
    }
}
