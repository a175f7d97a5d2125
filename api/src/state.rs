//! Application state, mirroring `crab-cloud::state::AppState`.

use std::sync::Arc;

use certs::CertificateEngine;
use lapin::options::{BasicQosOptions, ConfirmSelectOptions};
use lapin::{Connection, ConnectionProperties};
use queue::GenerationPublisher;
use sqlx::PgPool;
use storage::{ObjectStore, S3ObjectStore};
use tenant::TenantRegistry;
use verify::VerificationService;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub registry: TenantRegistry,
    pub engine: Arc<CertificateEngine>,
    pub verifier: Arc<VerificationService>,
    pub publisher: GenerationPublisher,
    pub jwt_secret: String,
    pub base_url: String,
    pub download_ttl_minutes: i64,
}

impl AppState {
    pub async fn new(config: &Config) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let pool = PgPool::connect(&config.database_url).await?;

        let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::from_env().await);
        store.ensure_bucket(&config.storage_bucket).await?;

        let engine = Arc::new(CertificateEngine::new(
            pool.clone(),
            store,
            config.storage_bucket.clone(),
            config.app_base_url.clone(),
        ));

        let registry = TenantRegistry::new(pool.clone());
        let verifier = Arc::new(VerificationService::new(pool.clone(), registry.clone()));

        let connection = Connection::connect(&config.amqp_url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel.confirm_select(ConfirmSelectOptions::default()).await?;
        channel.basic_qos(1, BasicQosOptions::default()).await?;
        let publisher = GenerationPublisher::new(channel).await?;

        Ok(Self {
            pool,
            registry,
            engine,
            verifier,
            publisher,
            jwt_secret: config.jwt_secret.clone(),
            base_url: config.app_base_url.clone(),
            download_ttl_minutes: config.download_ttl_minutes,
        })
    }
}
