//! Exchange/queue layout for the generation bus: one durable work queue,
//! a TTL-delayed retry queue that feeds transient failures back into the
//! work queue, and a dead-letter exchange/queue pair that messages land
//! in once their delivery count exceeds [`RETRY_BUDGET`] or the failure
//! is permanent.
//!
//! Plain `nack(requeue: true)` redelivers a message without touching
//! `x-death`, so a retry count built on that header never advances. The
//! work queue's dead-letter target is the retry exchange instead: a
//! rejected message parks in [`RETRY_QUEUE`] for [`RETRY_DELAY_MS`],
//! picks up an `x-death` entry on the way, then expires back onto the
//! work queue. Permanent/exhausted failures skip the retry hop and are
//! republished directly onto [`DEAD_LETTER_EXCHANGE`].

use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{Channel, ExchangeKind};
use shared::error::AppError;

pub const EXCHANGE: &str = "certificates.generation";
pub const QUEUE: &str = "certificates.generation.work";
pub const ROUTING_KEY: &str = "generate";

pub const RETRY_EXCHANGE: &str = "certificates.generation.retry";
pub const RETRY_QUEUE: &str = "certificates.generation.retry";
pub const RETRY_DELAY_MS: i32 = 10_000;

pub const DEAD_LETTER_EXCHANGE: &str = "certificates.generation.dlx";
pub const DEAD_LETTER_QUEUE: &str = "certificates.generation.dlq";

/// Messages are dead-lettered once this many delivery attempts have
/// failed, per SPEC_FULL.md's default retry budget.
pub const RETRY_BUDGET: usize = 3;

pub async fn declare(channel: &Channel) -> Result<(), AppError> {
    channel
        .exchange_declare(
            DEAD_LETTER_EXCHANGE,
            ExchangeKind::Direct,
            ExchangeDeclareOptions { durable: true, ..Default::default() },
            FieldTable::default(),
        )
        .await
        .map_err(declare_failed)?;

    channel
        .queue_declare(DEAD_LETTER_QUEUE, QueueDeclareOptions { durable: true, ..Default::default() }, FieldTable::default())
        .await
        .map_err(declare_failed)?;

    channel
        .queue_bind(DEAD_LETTER_QUEUE, DEAD_LETTER_EXCHANGE, ROUTING_KEY, QueueBindOptions::default(), FieldTable::default())
        .await
        .map_err(declare_failed)?;

    channel
        .exchange_declare(
            EXCHANGE,
            ExchangeKind::Direct,
            ExchangeDeclareOptions { durable: true, ..Default::default() },
            FieldTable::default(),
        )
        .await
        .map_err(declare_failed)?;

    channel
        .exchange_declare(
            RETRY_EXCHANGE,
            ExchangeKind::Direct,
            ExchangeDeclareOptions { durable: true, ..Default::default() },
            FieldTable::default(),
        )
        .await
        .map_err(declare_failed)?;

    let mut retry_queue_args = FieldTable::default();
    retry_queue_args.insert("x-dead-letter-exchange".into(), AMQPValue::LongString(EXCHANGE.into()));
    retry_queue_args.insert("x-dead-letter-routing-key".into(), AMQPValue::LongString(ROUTING_KEY.into()));
    retry_queue_args.insert("x-message-ttl".into(), AMQPValue::LongInt(RETRY_DELAY_MS));

    channel
        .queue_declare(RETRY_QUEUE, QueueDeclareOptions { durable: true, ..Default::default() }, retry_queue_args)
        .await
        .map_err(declare_failed)?;

    channel
        .queue_bind(RETRY_QUEUE, RETRY_EXCHANGE, ROUTING_KEY, QueueBindOptions::default(), FieldTable::default())
        .await
        .map_err(declare_failed)?;

    let mut work_queue_args = FieldTable::default();
    work_queue_args.insert("x-dead-letter-exchange".into(), AMQPValue::LongString(RETRY_EXCHANGE.into()));
    work_queue_args.insert("x-dead-letter-routing-key".into(), AMQPValue::LongString(ROUTING_KEY.into()));

    channel
        .queue_declare(QUEUE, QueueDeclareOptions { durable: true, ..Default::default() }, work_queue_args)
        .await
        .map_err(declare_failed)?;

    channel
        .queue_bind(QUEUE, EXCHANGE, ROUTING_KEY, QueueBindOptions::default(), FieldTable::default())
        .await
        .map_err(declare_failed)?;

    Ok(())
}

fn declare_failed(e: lapin::Error) -> AppError {
    AppError::with_message(shared::error::ErrorCode::QueuePublishFailed, format!("failed to declare queue topology: {e}"))
}
