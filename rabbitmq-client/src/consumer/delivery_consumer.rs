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
use std::iter::FusedIterator;
use std::sync::Arc;

use cheetah_string::CheetahString;
use parking_lot::Mutex;
use rabbitmq_error::RabbitMQError;
use rabbitmq_error::RabbitMQResult;
use rabbitmq_rust::ClosableBlockingQueue;
use rabbitmq_rust::Timeout;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::channel::ArcChannel;
use crate::consumer::ack_policy::AckMode;
use crate::consumer::ack_policy::AckPolicy;
use crate::consumer::ack_policy::AutoAck;
use crate::consumer::ack_policy::ManualAck;
use crate::consumer::basic_consumer::BasicConsumer;
use crate::consumer::consumer_state::ConsumerState;
use crate::envelope::DeliveryEnvelope;
use crate::shutdown::ShutdownReason;

pub type DeliveryQueue = ClosableBlockingQueue<DeliveryEnvelope>;

/// Consumer acknowledging every delivery as it is dequeued.
pub type AutoAckConsumer = DeliveryConsumer<AutoAck>;

/// Consumer leaving acknowledgment to the application.
pub type ManualAckConsumer = DeliveryConsumer<ManualAck>;

#[derive(Default)]
struct Lifecycle {
    state: ConsumerState,
    consumer_tag: Option<CheetahString>,
    shutdown_reason: Option<ShutdownReason>,
    /// Set by the first `cancel()` that sends the broker cancel.
    cancel_requested: bool,
}

/// Buffers deliveries pushed by the protocol layer until application threads
/// dequeue them, applying the acknowledgment policy `P` to each one.
///
/// The consumer owns the lifecycle of its queue: cancellation, whether
/// explicit or caused by transport loss, closes the queue exactly once.
/// Buffered deliveries can still be drained after that; only then do dequeue
/// calls fail with [`RabbitMQError::QueueClosed`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use cheetah_string::CheetahString;
/// use rabbitmq_client_rust::BasicConsumer;
/// use rabbitmq_client_rust::BasicProperties;
/// use rabbitmq_client_rust::Channel;
/// use rabbitmq_client_rust::DeliveryEnvelope;
/// use rabbitmq_client_rust::ManualAckConsumer;
/// use rabbitmq_error::RabbitMQResult;
///
/// struct NoopChannel;
///
/// impl Channel for NoopChannel {
///     fn acknowledge(&self, _delivery_tag: u64) -> RabbitMQResult<()> {
///         Ok(())
///     }
///     fn reject(&self, _delivery_tag: u64, _requeue: bool) -> RabbitMQResult<()> {
///         Ok(())
///     }
///     fn cancel(&self, _consumer_tag: &CheetahString) -> RabbitMQResult<()> {
///         Ok(())
///     }
/// }
///
/// let consumer = ManualAckConsumer::new(Arc::new(NoopChannel));
/// consumer.handle_consume_ok("amq.ctag-1".into()).unwrap();
/// consumer
///     .handle_deliver(DeliveryEnvelope::new(
///         "amq.ctag-1",
///         1,
///         false,
///         "",
///         "tasks",
///         BasicProperties::default(),
///         b"hello".to_vec(),
///     ))
///     .unwrap();
///
/// let delivery = consumer.dequeue().unwrap();
/// assert_eq!(delivery.body().as_ref(), b"hello");
/// consumer.channel().acknowledge(delivery.delivery_tag()).unwrap();
/// ```
pub struct DeliveryConsumer<P = ManualAck> {
    channel: ArcChannel,
    queue: Arc<DeliveryQueue>,
    policy: P,
    lifecycle: Mutex<Lifecycle>,
}

impl<P> DeliveryConsumer<P>
where
    P: AckPolicy + Default,
{
    /// Creates a consumer with a fresh private queue.
    pub fn new(channel: ArcChannel) -> Self {
        Self::with_queue(channel, Arc::new(DeliveryQueue::new()))
    }

    /// Creates a consumer delivering into an existing, possibly shared, queue.
    pub fn with_queue(channel: ArcChannel, queue: Arc<DeliveryQueue>) -> Self {
        Self::with_policy(channel, queue, P::default())
    }
}

impl<P> DeliveryConsumer<P>
where
    P: AckPolicy,
{
    pub fn with_policy(channel: ArcChannel, queue: Arc<DeliveryQueue>, policy: P) -> Self {
        DeliveryConsumer {
            channel,
            queue,
            policy,
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    #[inline]
    pub fn channel(&self) -> &ArcChannel {
        &self.channel
    }

    #[inline]
    pub fn queue(&self) -> &Arc<DeliveryQueue> {
        &self.queue
    }

    #[inline]
    pub fn ack_mode(&self) -> AckMode {
        self.policy.mode()
    }

    pub fn state(&self) -> ConsumerState {
        self.lifecycle.lock().state
    }

    /// Tag assigned by the broker on consume-ok.
    pub fn consumer_tag(&self) -> Option<CheetahString> {
        self.lifecycle.lock().consumer_tag.clone()
    }

    /// Set once the transport under this consumer was lost.
    pub fn shutdown_reason(&self) -> Option<ShutdownReason> {
        self.lifecycle.lock().shutdown_reason.clone()
    }

    /// Takes the next delivery, blocking until one arrives.
    ///
    /// # Errors
    ///
    /// [`RabbitMQError::QueueClosed`] once the consumer is cancelled and its
    /// queue drained, or the acknowledgment policy's channel error.
    pub fn dequeue(&self) -> RabbitMQResult<DeliveryEnvelope> {
        let envelope = self.queue.dequeue()?;
        self.policy.on_dequeued(self.channel.as_ref(), &envelope)?;
        Ok(envelope)
    }

    /// Takes the next delivery, waiting at most `timeout`. `Ok(None)` means
    /// the wait timed out.
    pub fn dequeue_timeout(&self, timeout: impl Into<Timeout>) -> RabbitMQResult<Option<DeliveryEnvelope>> {
        let envelope = self.queue.dequeue_timeout(timeout)?;
        self.settle_dequeued(envelope)
    }

    /// Takes the next delivery if one is buffered, without blocking.
    pub fn dequeue_no_wait(&self) -> RabbitMQResult<Option<DeliveryEnvelope>> {
        let envelope = self.queue.try_dequeue()?;
        self.settle_dequeued(envelope)
    }

    /// Waits until a delivery is buffered, without taking it.
    pub fn wait_for_message(&self, timeout: impl Into<Timeout>) -> bool {
        self.queue.wait_for_message(timeout)
    }

    /// Blocking iterator over deliveries, ending once the consumer's queue
    /// is closed and drained. Acknowledgment failures are yielded as errors.
    pub fn deliveries(&self) -> Deliveries<'_, P> {
        Deliveries {
            consumer: self,
            finished: false,
        }
    }

    /// Unsubscribes and closes the queue.
    ///
    /// The broker is asked to cancel the subscription if it is active; the
    /// queue is closed locally either way, so blocked dequeuers are released
    /// even if the cancel request fails. Calling this again is a no-op.
    pub fn cancel(&self) -> RabbitMQResult<()> {
        let consumer_tag = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state == ConsumerState::Consuming && !lifecycle.cancel_requested {
                lifecycle.cancel_requested = true;
                lifecycle.consumer_tag.clone()
            } else {
                None
            }
        };
        let cancelled = match consumer_tag {
            Some(ref consumer_tag) => self.channel.cancel(consumer_tag),
            None => Ok(()),
        };
        self.on_cancel();
        cancelled
    }

    pub(crate) fn settle_dequeued(&self, envelope: Option<DeliveryEnvelope>) -> RabbitMQResult<Option<DeliveryEnvelope>> {
        match envelope {
            Some(envelope) => {
                self.policy.on_dequeued(self.channel.as_ref(), &envelope)?;
                Ok(Some(envelope))
            }
            None => Ok(None),
        }
    }

    fn on_cancel(&self) {
        let (previous, consumer_tag) = {
            let mut lifecycle = self.lifecycle.lock();
            let previous = std::mem::replace(&mut lifecycle.state, ConsumerState::Canceled);
            (previous, lifecycle.consumer_tag.clone())
        };
        if previous == ConsumerState::Canceled {
            return;
        }
        self.queue.close();
        info!(
            "consumer {:?} canceled from state {}, {} delivery(ies) left to drain",
            consumer_tag,
            previous,
            self.queue.len()
        );
    }
}

impl<P> BasicConsumer for DeliveryConsumer<P>
where
    P: AckPolicy,
{
    fn handle_consume_ok(&self, consumer_tag: CheetahString) -> RabbitMQResult<()> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state != ConsumerState::Created {
            return Err(RabbitMQError::consumer_invalid_state(
                "CREATED",
                lifecycle.state.to_string(),
            ));
        }
        info!("consumer {} started, ack mode {}", consumer_tag, self.policy.mode());
        lifecycle.state = ConsumerState::Consuming;
        lifecycle.consumer_tag = Some(consumer_tag);
        Ok(())
    }

    fn handle_deliver(&self, envelope: DeliveryEnvelope) -> RabbitMQResult<()> {
        let delivery_tag = envelope.delivery_tag();
        debug!("buffering delivery {} for consumer {}", delivery_tag, envelope.consumer_tag());
        self.queue.enqueue(envelope).inspect_err(|_| {
            warn!("delivery {} arrived after the consumer queue was closed", delivery_tag);
        })
    }

    fn handle_cancel(&self, consumer_tag: &CheetahString) {
        info!("consumer {} canceled by broker", consumer_tag);
        self.on_cancel();
    }

    fn handle_cancel_ok(&self, consumer_tag: &CheetahString) {
        debug!("cancel of consumer {} confirmed", consumer_tag);
        self.on_cancel();
    }

    fn handle_shutdown(&self, reason: ShutdownReason) {
        {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state.is_terminal() {
                return;
            }
            lifecycle.state = ConsumerState::TransportLost;
            lifecycle.shutdown_reason = Some(reason.clone());
        }
        if reason.is_clean() {
            info!("consumer transport closed: {}", reason);
        } else {
            warn!("consumer transport lost: {}", reason);
        }
        self.on_cancel();
    }
}

impl<P> fmt::Debug for DeliveryConsumer<P>
where
    P: AckPolicy,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lifecycle = self.lifecycle.lock();
        f.debug_struct("DeliveryConsumer")
            .field("ack_mode", &self.policy.mode())
            .field("state", &lifecycle.state)
            .field("consumer_tag", &lifecycle.consumer_tag)
            .field("queue", &self.queue)
            .finish()
    }
}

/// Iterator returned by [`DeliveryConsumer::deliveries`].
pub struct Deliveries<'a, P> {
    consumer: &'a DeliveryConsumer<P>,
    finished: bool,
}

impl<P> Iterator for Deliveries<'_, P>
where
    P: AckPolicy,
{
    type Item = RabbitMQResult<DeliveryEnvelope>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.consumer.dequeue() {
            Ok(envelope) => Some(Ok(envelope)),
            Err(err) if err.is_queue_closed() => {
                self.finished = true;
                None
            }
            Err(err) => Some(Err(err)),
        }
    }
}

impl<P> FusedIterator for Deliveries<'_, P> where P: AckPolicy {}
