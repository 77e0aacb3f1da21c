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

use std::sync::Arc;

use cheetah_string::CheetahString;
use rabbitmq_error::RabbitMQError;
use rabbitmq_error::RabbitMQResult;
use rabbitmq_rust::Timeout;
use tracing::info;
use tracing::warn;

use crate::base::consumer_config::ConsumerConfig;
use crate::channel::ArcChannel;
use crate::consumer::ack_policy::AckMode;
use crate::consumer::basic_consumer::BasicConsumer;
use crate::consumer::consumer_state::ConsumerState;
use crate::consumer::delivery_consumer::AutoAckConsumer;
use crate::consumer::delivery_consumer::DeliveryQueue;
use crate::consumer::delivery_consumer::ManualAckConsumer;
use crate::consumer::transactional_consumer::TransactionalConsumer;
use crate::envelope::DeliveryEnvelope;
use crate::shutdown::ShutdownReason;
use crate::transaction::Transaction;

/// Outcome of [`Subscriber::receive`].
#[derive(Debug)]
pub enum Received {
    Delivery(DeliveryEnvelope),
    /// Nothing arrived within the receive timeout.
    TimedOut,
    /// The subscription ended. `faulted` is set when the transport was lost
    /// with a non-success reply code.
    Closed { faulted: bool },
}

impl Received {
    pub fn into_delivery(self) -> Option<DeliveryEnvelope> {
        match self {
            Received::Delivery(envelope) => Some(envelope),
            _ => None,
        }
    }
}

enum ConsumerKind {
    AutoAck(Arc<AutoAckConsumer>),
    ManualAck(Arc<ManualAckConsumer>),
    Transactional(Arc<TransactionalConsumer>),
}

/// A consumer whose acknowledgment mode is taken from [`ConsumerConfig`].
///
/// The mode is fixed when the subscriber is built. Register
/// [`basic_consumer`](Subscriber::basic_consumer) with the protocol layer,
/// then pull deliveries with [`receive`](Subscriber::receive).
pub struct Subscriber {
    kind: ConsumerKind,
    receive_timeout: Timeout,
}

impl Subscriber {
    pub fn new(channel: ArcChannel, config: &ConsumerConfig) -> Self {
        Self::with_queue(channel, Arc::new(DeliveryQueue::new()), config)
    }

    pub fn with_queue(channel: ArcChannel, queue: Arc<DeliveryQueue>, config: &ConsumerConfig) -> Self {
        let kind = match config.ack_mode {
            AckMode::Auto => ConsumerKind::AutoAck(Arc::new(AutoAckConsumer::with_queue(channel, queue))),
            AckMode::Manual => ConsumerKind::ManualAck(Arc::new(ManualAckConsumer::with_queue(channel, queue))),
            AckMode::Transactional => {
                ConsumerKind::Transactional(Arc::new(TransactionalConsumer::with_queue(channel, queue)))
            }
        };
        Subscriber {
            kind,
            receive_timeout: config.receive_timeout(),
        }
    }

    pub fn ack_mode(&self) -> AckMode {
        match &self.kind {
            ConsumerKind::AutoAck(consumer) => consumer.ack_mode(),
            ConsumerKind::ManualAck(consumer) => consumer.ack_mode(),
            ConsumerKind::Transactional(consumer) => consumer.ack_mode(),
        }
    }

    #[inline]
    pub fn receive_timeout(&self) -> Timeout {
        self.receive_timeout
    }

    /// Handle to register with the protocol layer.
    pub fn basic_consumer(&self) -> Arc<dyn BasicConsumer> {
        match &self.kind {
            ConsumerKind::AutoAck(consumer) => Arc::clone(consumer) as Arc<dyn BasicConsumer>,
            ConsumerKind::ManualAck(consumer) => Arc::clone(consumer) as Arc<dyn BasicConsumer>,
            ConsumerKind::Transactional(consumer) => Arc::clone(consumer) as Arc<dyn BasicConsumer>,
        }
    }

    pub fn queue(&self) -> &Arc<DeliveryQueue> {
        match &self.kind {
            ConsumerKind::AutoAck(consumer) => consumer.queue(),
            ConsumerKind::ManualAck(consumer) => consumer.queue(),
            ConsumerKind::Transactional(consumer) => consumer.queue(),
        }
    }

    pub fn channel(&self) -> &ArcChannel {
        match &self.kind {
            ConsumerKind::AutoAck(consumer) => consumer.channel(),
            ConsumerKind::ManualAck(consumer) => consumer.channel(),
            ConsumerKind::Transactional(consumer) => consumer.channel(),
        }
    }

    pub fn state(&self) -> ConsumerState {
        match &self.kind {
            ConsumerKind::AutoAck(consumer) => consumer.state(),
            ConsumerKind::ManualAck(consumer) => consumer.state(),
            ConsumerKind::Transactional(consumer) => consumer.state(),
        }
    }

    pub fn consumer_tag(&self) -> Option<CheetahString> {
        match &self.kind {
            ConsumerKind::AutoAck(consumer) => consumer.consumer_tag(),
            ConsumerKind::ManualAck(consumer) => consumer.consumer_tag(),
            ConsumerKind::Transactional(consumer) => consumer.consumer_tag(),
        }
    }

    pub fn shutdown_reason(&self) -> Option<ShutdownReason> {
        match &self.kind {
            ConsumerKind::AutoAck(consumer) => consumer.shutdown_reason(),
            ConsumerKind::ManualAck(consumer) => consumer.shutdown_reason(),
            ConsumerKind::Transactional(consumer) => consumer.shutdown_reason(),
        }
    }

    pub fn wait_for_message(&self, timeout: impl Into<Timeout>) -> bool {
        self.queue().wait_for_message(timeout)
    }

    pub fn cancel(&self) -> RabbitMQResult<()> {
        match &self.kind {
            ConsumerKind::AutoAck(consumer) => consumer.cancel(),
            ConsumerKind::ManualAck(consumer) => consumer.cancel(),
            ConsumerKind::Transactional(consumer) => consumer.cancel(),
        }
    }

    /// Waits up to the configured receive timeout for the next delivery.
    ///
    /// A transactional subscriber requires `txn`; the other modes ignore it.
    /// Queue closure is reported as [`Received::Closed`] rather than an
    /// error.
    pub fn receive(&self, txn: Option<&Transaction>) -> RabbitMQResult<Received> {
        let dequeued = match &self.kind {
            ConsumerKind::AutoAck(consumer) => consumer.dequeue_timeout(self.receive_timeout),
            ConsumerKind::ManualAck(consumer) => consumer.dequeue_timeout(self.receive_timeout),
            ConsumerKind::Transactional(consumer) => {
                let txn = txn.ok_or_else(|| RabbitMQError::transaction_not_active("NONE"))?;
                consumer.dequeue_timeout(self.receive_timeout, txn)
            }
        };
        match dequeued {
            Ok(Some(envelope)) => Ok(Received::Delivery(envelope)),
            Ok(None) => Ok(Received::TimedOut),
            Err(err) if err.is_queue_closed() => Ok(self.closed()),
            Err(err) => Err(err),
        }
    }

    fn closed(&self) -> Received {
        match self.shutdown_reason() {
            Some(reason) if !reason.is_clean() => {
                warn!("subscription ended by transport failure: {}", reason);
                Received::Closed { faulted: true }
            }
            _ => {
                info!("subscription {:?} ended", self.consumer_tag());
                Received::Closed { faulted: false }
            }
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("ack_mode", &self.ack_mode())
            .field("state", &self.state())
            .field("receive_timeout", &self.receive_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::channel::MockChannel;
    use crate::envelope::BasicProperties;
    use crate::shutdown::ShutdownInitiator;

    fn config(ack_mode: AckMode) -> ConsumerConfig {
        ConsumerConfig::builder()
            .ack_mode(ack_mode)
            .receive_timeout_millis(20)
            .build()
            .unwrap()
    }

    fn deliver(subscriber: &Subscriber, delivery_tag: u64) {
        subscriber
            .basic_consumer()
            .handle_deliver(DeliveryEnvelope::new(
                "ctag-sub",
                delivery_tag,
                false,
                "",
                "events",
                BasicProperties::default(),
                &b"event"[..],
            ))
            .unwrap();
    }

    #[test]
    fn mode_follows_config() {
        for mode in [AckMode::Auto, AckMode::Manual, AckMode::Transactional] {
            let subscriber = Subscriber::new(Arc::new(MockChannel::new()), &config(mode));
            assert_eq!(subscriber.ack_mode(), mode);
        }
    }

    #[test]
    fn auto_subscriber_acknowledges_on_receive() {
        let mut channel = MockChannel::new();
        channel.expect_acknowledge().with(eq(11)).times(1).returning(|_| Ok(()));
        let subscriber = Subscriber::new(Arc::new(channel), &config(AckMode::Auto));
        deliver(&subscriber, 11);
        let envelope = subscriber.receive(None).unwrap().into_delivery().unwrap();
        assert_eq!(envelope.delivery_tag(), 11);
    }

    #[test]
    fn receive_times_out_on_empty_queue() {
        let subscriber = Subscriber::new(Arc::new(MockChannel::new()), &config(AckMode::Manual));
        assert!(matches!(subscriber.receive(None).unwrap(), Received::TimedOut));
    }

    #[test]
    fn transactional_receive_requires_transaction() {
        let subscriber = Subscriber::new(Arc::new(MockChannel::new()), &config(AckMode::Transactional));
        deliver(&subscriber, 1);
        assert!(subscriber.receive(None).is_err());
        assert_eq!(subscriber.queue().len(), 1);
    }

    #[test]
    fn transactional_receive_enlists() {
        let mut channel = MockChannel::new();
        channel.expect_acknowledge().with(eq(2)).times(1).returning(|_| Ok(()));
        let subscriber = Subscriber::new(Arc::new(channel), &config(AckMode::Transactional));
        deliver(&subscriber, 2);
        let txn = Transaction::new();
        assert!(matches!(subscriber.receive(Some(&txn)).unwrap(), Received::Delivery(_)));
        txn.commit().unwrap();
    }

    #[test]
    fn closure_reports_fault_from_shutdown_reason() {
        let clean = Subscriber::new(Arc::new(MockChannel::new()), &config(AckMode::Manual));
        clean.basic_consumer().handle_shutdown(ShutdownReason::application());
        assert!(matches!(clean.receive(None).unwrap(), Received::Closed { faulted: false }));

        let lost = Subscriber::new(Arc::new(MockChannel::new()), &config(AckMode::Manual));
        lost.basic_consumer()
            .handle_shutdown(ShutdownReason::new(ShutdownInitiator::Library, 541, "INTERNAL_ERROR"));
        assert!(matches!(lost.receive(None).unwrap(), Received::Closed { faulted: true }));
    }
}
