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

use rabbitmq_error::RabbitMQResult;
use tracing::debug;
use tracing::warn;

use crate::base::consumer_config::ConsumerConfig;
use crate::channel::ArcChannel;
use crate::envelope::DeliveryEnvelope;

/// Runs application handlers for manually acknowledged deliveries and
/// settles each delivery from the handler's result.
///
/// A successful handler acknowledges the delivery. A failed handler rejects
/// it, requeueing according to `requeue_on_failure`, and its error is handed
/// back untouched.
#[derive(Clone)]
pub struct MessageAcknowledgeHandler {
    channel: ArcChannel,
    requeue_on_failure: bool,
}

impl MessageAcknowledgeHandler {
    pub fn new(channel: ArcChannel) -> Self {
        Self::with_requeue(channel, true)
    }

    pub fn with_requeue(channel: ArcChannel, requeue_on_failure: bool) -> Self {
        MessageAcknowledgeHandler {
            channel,
            requeue_on_failure,
        }
    }

    pub fn from_config(channel: ArcChannel, config: &ConsumerConfig) -> Self {
        Self::with_requeue(channel, config.requeue_on_failure)
    }

    #[inline]
    pub fn requeue_on_failure(&self) -> bool {
        self.requeue_on_failure
    }

    /// Calls `handler` with `envelope` and settles the delivery.
    ///
    /// The outer result carries channel failures while acknowledging or
    /// rejecting; the inner one is the handler's own result.
    pub fn invoke<F, R, E>(&self, envelope: &DeliveryEnvelope, handler: F) -> RabbitMQResult<Result<R, E>>
    where
        F: FnOnce(&DeliveryEnvelope) -> Result<R, E>,
    {
        let delivery_tag = envelope.delivery_tag();
        let outcome = handler(envelope);
        match outcome {
            Ok(_) => {
                self.channel.acknowledge(delivery_tag)?;
                debug!("delivery {} handled and acknowledged", delivery_tag);
            }
            Err(_) => {
                self.channel.reject(delivery_tag, self.requeue_on_failure)?;
                warn!(
                    "handler failed for delivery {}, rejected with requeue={}",
                    delivery_tag, self.requeue_on_failure
                );
            }
        }
        Ok(outcome)
    }
}

impl std::fmt::Debug for MessageAcknowledgeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageAcknowledgeHandler")
            .field("requeue_on_failure", &self.requeue_on_failure)
            .finish_non_exhaustive()
    }
}
