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

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use cheetah_string::CheetahString;
use rabbitmq_error::RabbitMQResult;
use rabbitmq_rust::Timeout;
use tracing::debug;
use tracing::warn;

use crate::channel::ArcChannel;
use crate::consumer::ack_policy::AckMode;
use crate::consumer::basic_consumer::BasicConsumer;
use crate::consumer::consumer_state::ConsumerState;
use crate::consumer::delivery_consumer::DeliveryQueue;
use crate::consumer::ack_policy::TransactionalAck;
use crate::consumer::delivery_consumer::DeliveryConsumer;
use crate::envelope::DeliveryEnvelope;
use crate::shutdown::ShutdownReason;
use crate::transaction::EnlistmentNotification;
use crate::transaction::Transaction;

/// Consumer whose deliveries are settled by the outcome of a [`Transaction`].
///
/// Every delivery dequeued under a transaction is acknowledged when the
/// transaction commits and rejected with requeue when it rolls back. An
/// in-doubt outcome leaves the delivery unsettled.
pub struct TransactionalConsumer {
    inner: DeliveryConsumer<TransactionalAck>,
}

impl TransactionalConsumer {
    pub fn new(channel: ArcChannel) -> Self {
        TransactionalConsumer {
            inner: DeliveryConsumer::new(channel),
        }
    }

    pub fn with_queue(channel: ArcChannel, queue: Arc<DeliveryQueue>) -> Self {
        TransactionalConsumer {
            inner: DeliveryConsumer::with_queue(channel, queue),
        }
    }

    #[inline]
    pub fn ack_mode(&self) -> AckMode {
        self.inner.ack_mode()
    }

    #[inline]
    pub fn channel(&self) -> &ArcChannel {
        self.inner.channel()
    }

    #[inline]
    pub fn queue(&self) -> &Arc<DeliveryQueue> {
        self.inner.queue()
    }

    pub fn state(&self) -> ConsumerState {
        self.inner.state()
    }

    pub fn consumer_tag(&self) -> Option<CheetahString> {
        self.inner.consumer_tag()
    }

    pub fn shutdown_reason(&self) -> Option<ShutdownReason> {
        self.inner.shutdown_reason()
    }

    /// Takes the next delivery, blocking until one arrives, and enlists it in
    /// `txn`.
    ///
    /// `txn` is checked before waiting; an inactive transaction fails without
    /// touching the queue.
    pub fn dequeue(&self, txn: &Transaction) -> RabbitMQResult<DeliveryEnvelope> {
        txn.ensure_active()?;
        let envelope = self.inner.dequeue()?;
        self.enlist(txn, &envelope)?;
        Ok(envelope)
    }

    pub fn dequeue_timeout(
        &self,
        timeout: impl Into<Timeout>,
        txn: &Transaction,
    ) -> RabbitMQResult<Option<DeliveryEnvelope>> {
        txn.ensure_active()?;
        let envelope = self.inner.dequeue_timeout(timeout)?;
        self.enlist_dequeued(txn, envelope)
    }

    pub fn dequeue_no_wait(&self, txn: &Transaction) -> RabbitMQResult<Option<DeliveryEnvelope>> {
        txn.ensure_active()?;
        let envelope = self.inner.dequeue_no_wait()?;
        self.enlist_dequeued(txn, envelope)
    }

    pub fn wait_for_message(&self, timeout: impl Into<Timeout>) -> bool {
        self.inner.wait_for_message(timeout)
    }

    pub fn cancel(&self) -> RabbitMQResult<()> {
        self.inner.cancel()
    }

    fn enlist_dequeued(
        &self,
        txn: &Transaction,
        envelope: Option<DeliveryEnvelope>,
    ) -> RabbitMQResult<Option<DeliveryEnvelope>> {
        match envelope {
            Some(envelope) => {
                self.enlist(txn, &envelope)?;
                Ok(Some(envelope))
            }
            None => Ok(None),
        }
    }

    /// The transaction may complete on another thread between the activity
    /// check and this call. The delivery is then handed back to the broker.
    fn enlist(&self, txn: &Transaction, envelope: &DeliveryEnvelope) -> RabbitMQResult<()> {
        let delivery_tag = envelope.delivery_tag();
        let enlistment = DeliveryEnlistment::new(delivery_tag, Arc::clone(self.channel()));
        match txn.enlist(Box::new(enlistment)) {
            Ok(()) => {
                debug!("delivery {} enlisted in transaction", delivery_tag);
                Ok(())
            }
            Err(err) => {
                warn!("delivery {} could not be enlisted, requeueing: {}", delivery_tag, err);
                self.channel().reject(delivery_tag, true)?;
                Err(err)
            }
        }
    }
}

impl BasicConsumer for TransactionalConsumer {
    fn handle_consume_ok(&self, consumer_tag: CheetahString) -> RabbitMQResult<()> {
        self.inner.handle_consume_ok(consumer_tag)
    }

    fn handle_deliver(&self, envelope: DeliveryEnvelope) -> RabbitMQResult<()> {
        self.inner.handle_deliver(envelope)
    }

    fn handle_cancel(&self, consumer_tag: &CheetahString) {
        self.inner.handle_cancel(consumer_tag)
    }

    fn handle_cancel_ok(&self, consumer_tag: &CheetahString) {
        self.inner.handle_cancel_ok(consumer_tag)
    }

    fn handle_shutdown(&self, reason: ShutdownReason) {
        self.inner.handle_shutdown(reason)
    }
}

impl fmt::Debug for TransactionalConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionalConsumer")
            .field("inner", &self.inner)
            .finish()
    }
}

/// Settles one delivery when its transaction completes.
///
/// Exactly one of acknowledge or reject is ever sent for the delivery.
pub struct DeliveryEnlistment {
    delivery_tag: u64,
    channel: ArcChannel,
    settled: AtomicBool,
}

impl DeliveryEnlistment {
    pub fn new(delivery_tag: u64, channel: ArcChannel) -> Self {
        DeliveryEnlistment {
            delivery_tag,
            channel,
            settled: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    fn settle(&self) -> bool {
        !self.settled.swap(true, Ordering::AcqRel)
    }
}

impl EnlistmentNotification for DeliveryEnlistment {
    fn commit(&self) -> RabbitMQResult<()> {
        if !self.settle() {
            return Ok(());
        }
        self.channel.acknowledge(self.delivery_tag)
    }

    fn rollback(&self) -> RabbitMQResult<()> {
        if !self.settle() {
            return Ok(());
        }
        self.channel.reject(self.delivery_tag, true)
    }

    fn in_doubt(&self) {
        debug!("delivery {} left unsettled, transaction in doubt", self.delivery_tag);
    }
}
