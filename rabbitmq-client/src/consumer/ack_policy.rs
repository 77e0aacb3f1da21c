// Copyright 2023 The RabbitMQ Rust Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt::Display;
use std::str::FromStr;

use rabbitmq_error::RabbitMQError;
use rabbitmq_error::RabbitMQResult;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::channel::Channel;
use crate::envelope::DeliveryEnvelope;

/// How deliveries taken from a consumer are acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckMode {
    /// Acknowledged as soon as they are dequeued
    Auto,
    /// Acknowledged by the application through the delivery tag
    #[default]
    Manual,
    /// Acknowledged on commit, requeued on rollback
    Transactional,
}

impl Display for AckMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AckMode::Auto => write!(f, "auto"),
            AckMode::Manual => write!(f, "manual"),
            AckMode::Transactional => write!(f, "transactional"),
        }
    }
}

impl FromStr for AckMode {
    type Err = RabbitMQError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(AckMode::Auto),
            "manual" => Ok(AckMode::Manual),
            "transactional" => Ok(AckMode::Transactional),
            _ => Err(RabbitMQError::config_invalid_value(
                "ack_mode",
                s,
                "expected one of auto, manual, transactional",
            )),
        }
    }
}

/// Action a consumer takes on every delivery it hands to the application.
///
/// Runs after the delivery left the queue and after the queue lock was
/// released. An error is returned from the dequeue call that triggered it.
pub trait AckPolicy: Send + Sync {
    fn mode(&self) -> AckMode;

    fn on_dequeued(&self, channel: &dyn Channel, envelope: &DeliveryEnvelope) -> RabbitMQResult<()>;
}

/// Acknowledges each delivery before it is returned to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoAck;

impl AckPolicy for AutoAck {
    fn mode(&self) -> AckMode {
        AckMode::Auto
    }

    fn on_dequeued(&self, channel: &dyn Channel, envelope: &DeliveryEnvelope) -> RabbitMQResult<()> {
        debug!("auto-acknowledging delivery {}", envelope.delivery_tag());
        channel.acknowledge(envelope.delivery_tag())
    }
}

/// Leaves acknowledgment to the application.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualAck;

impl AckPolicy for ManualAck {
    fn mode(&self) -> AckMode {
        AckMode::Manual
    }

    fn on_dequeued(&self, _channel: &dyn Channel, _envelope: &DeliveryEnvelope) -> RabbitMQResult<()> {
        Ok(())
    }
}

/// Policy of a [`TransactionalConsumer`](crate::TransactionalConsumer).
///
/// Settlement is deferred to the transaction the delivery is enlisted in, so
/// nothing happens at dequeue time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionalAck;

impl AckPolicy for TransactionalAck {
    fn mode(&self) -> AckMode {
        AckMode::Transactional
    }

    fn on_dequeued(&self, _channel: &dyn Channel, _envelope: &DeliveryEnvelope) -> RabbitMQResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::channel::MockChannel;
    use crate::envelope::BasicProperties;

    fn envelope(delivery_tag: u64) -> DeliveryEnvelope {
        DeliveryEnvelope::new("ctag", delivery_tag, false, "", "q", BasicProperties::default(), Vec::new())
    }

    #[test]
    fn ack_mode_from_str() {
        assert_eq!(AckMode::from_str("auto").unwrap(), AckMode::Auto);
        assert_eq!(AckMode::from_str("Manual").unwrap(), AckMode::Manual);
        assert_eq!(AckMode::from_str("TRANSACTIONAL").unwrap(), AckMode::Transactional);
        assert!(AckMode::from_str("none").is_err());
    }

    #[test]
    fn ack_mode_serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&AckMode::Transactional).unwrap(), "\"transactional\"");
        assert_eq!(serde_json::from_str::<AckMode>("\"auto\"").unwrap(), AckMode::Auto);
    }

    #[test]
    fn auto_ack_acknowledges_delivery_tag() {
        let mut channel = MockChannel::new();
        channel.expect_acknowledge().with(eq(5)).times(1).returning(|_| Ok(()));
        channel.expect_reject().never();

        AutoAck.on_dequeued(&channel, &envelope(5)).unwrap();
    }

    #[test]
    fn auto_ack_propagates_channel_failure() {
        let mut channel = MockChannel::new();
        channel
            .expect_acknowledge()
            .returning(|tag| Err(RabbitMQError::ack_failed(tag, "connection reset")));

        let err = AutoAck.on_dequeued(&channel, &envelope(9)).unwrap_err();
        assert_eq!(err.delivery_tag(), Some(9));
    }

    #[test]
    fn manual_ack_touches_nothing() {
        let mut channel = MockChannel::new();
        channel.expect_acknowledge().never();
        channel.expect_reject().never();

        ManualAck.on_dequeued(&channel, &envelope(1)).unwrap();
        assert_eq!(ManualAck.mode(), AckMode::Manual);
    }

    #[test]
    fn transactional_ack_defers_to_the_transaction() {
        let mut channel = MockChannel::new();
        channel.expect_acknowledge().never();
        channel.expect_reject().never();
        assert_eq!(TransactionalAck.mode(), AckMode::Transactional);
        TransactionalAck.on_dequeued(&channel, &envelope(4)).unwrap();
    }
}
