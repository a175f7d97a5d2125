//! One inbound delivery: the decoded message plus the ack/nack handle
//! and the delivery count read off RabbitMQ's `x-death` header.

use lapin::message::Delivery as RawDelivery;
use lapin::options::{BasicAckOptions, BasicNackOptions, BasicPublishOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::Channel;
use shared::error::AppError;

use crate::message::GenerationMessage;
use crate::topology::{self, RETRY_BUDGET};

pub struct Delivery {
    pub message: GenerationMessage,
    pub delivery_count: usize,
    raw: RawDelivery,
}

impl Delivery {
    pub fn decode(raw: RawDelivery) -> Result<Self, AppError> {
        let message = GenerationMessage::from_bytes(&raw.data)?;
        let delivery_count = x_death_count(raw.properties.headers().as_ref());
        Ok(Self { message, delivery_count, raw })
    }

    pub fn retry_budget_exhausted(&self) -> bool {
        self.delivery_count >= RETRY_BUDGET
    }

    pub async fn ack(self) -> Result<(), AppError> {
        self.raw.ack(BasicAckOptions::default()).await.map_err(ack_failed)
    }

    /// Rejects without requeueing, sending the message to the work
    /// queue's configured dead-letter target — the retry queue, which
    /// holds it for [`topology::RETRY_DELAY_MS`] before feeding it back.
    /// Each hop through the retry queue appends/increments an `x-death`
    /// entry, which is what lets [`Delivery::retry_budget_exhausted`]
    /// eventually trip.
    pub async fn nack_retry(self) -> Result<(), AppError> {
        self.raw
            .nack(BasicNackOptions { requeue: false, ..Default::default() })
            .await
            .map_err(ack_failed)
    }

    /// Republishes the message directly onto the dead-letter exchange
    /// and acks the original delivery, bypassing the retry queue. Used
    /// once a failure is permanent or the retry budget is exhausted, so
    /// the message doesn't cycle through the retry delay again before
    /// landing in the DLQ.
    pub async fn dead_letter(self, channel: &Channel) -> Result<(), AppError> {
        channel
            .basic_publish(
                topology::DEAD_LETTER_EXCHANGE,
                topology::ROUTING_KEY,
                BasicPublishOptions::default(),
                &self.raw.data,
                self.raw.properties.clone(),
            )
            .await
            .map_err(ack_failed)?
            .await
            .map_err(ack_failed)?;
        self.raw.ack(BasicAckOptions::default()).await.map_err(ack_failed)
    }
}

fn x_death_count(headers: Option<&FieldTable>) -> usize {
    let Some(headers) = headers else { return 0 };
    let Some(AMQPValue::FieldArray(deaths)) = headers.inner().get("x-death") else { return 0 };
    deaths
        .as_slice()
        .iter()
        .filter_map(|entry| match entry {
            AMQPValue::FieldTable(table) => match table.inner().get("count") {
                Some(AMQPValue::LongLongInt(n)) => Some(*n as usize),
                _ => None,
            },
            _ => None,
        })
        .sum()
}

fn ack_failed(e: lapin::Error) -> AppError {
    AppError::internal(format!("failed to acknowledge queue delivery: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapin::types::{AMQPValue, LongLongInt, ShortString};

    fn death_headers(count: i64) -> FieldTable {
        let mut death = FieldTable::default();
        death.insert(ShortString::from("count"), AMQPValue::LongLongInt(count as LongLongInt));
        let mut headers = FieldTable::default();
        headers.insert(ShortString::from("x-death"), AMQPValue::FieldArray(vec![AMQPValue::FieldTable(death)].into()));
        headers
    }

    #[test]
    fn x_death_count_reads_the_count_field() {
        assert_eq!(x_death_count(Some(&death_headers(2))), 2);
    }

    #[test]
    fn x_death_count_is_zero_without_headers() {
        assert_eq!(x_death_count(None), 0);
    }
}
