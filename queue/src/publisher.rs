//! C9 — Generation Queue publish side.

use lapin::options::BasicPublishOptions;
use lapin::{BasicProperties, Channel};
use shared::error::{AppError, ErrorCode};

use crate::message::GenerationMessage;
use crate::topology;

#[derive(Clone)]
pub struct GenerationPublisher {
    channel: Channel,
}

impl GenerationPublisher {
    pub async fn new(channel: Channel) -> Result<Self, AppError> {
        topology::declare(&channel).await?;
        Ok(Self { channel })
    }

    /// Publish failure surfaces to the caller as `QueuePublishFailed`
    /// rather than silently dropping the certificate's async path.
    pub async fn publish(&self, message: &GenerationMessage) -> Result<(), AppError> {
        let payload = message.to_bytes()?;
        self.channel
            .basic_publish(
                topology::EXCHANGE,
                topology::ROUTING_KEY,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
            .map_err(publish_failed)?
            .await
            .map_err(publish_failed)?;
        Ok(())
    }
}

fn publish_failed(e: lapin::Error) -> AppError {
    AppError::with_message(ErrorCode::QueuePublishFailed, format!("failed to publish generation message: {e}"))
}
