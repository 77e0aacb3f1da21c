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
use rabbitmq_error::RabbitMQResult;

/// The protocol channel a consumer is bound to.
///
/// Consumers only ever settle deliveries through this trait. Implementations
/// must be callable from any thread; they are never invoked while a delivery
/// queue lock is held.
///
/// Failures are reported with [`RabbitMQError::ack_failed`],
/// [`RabbitMQError::reject_failed`], [`RabbitMQError::cancel_failed`] or, once
/// the channel is gone, [`RabbitMQError::channel_closed`].
///
/// [`RabbitMQError::ack_failed`]: rabbitmq_error::RabbitMQError::ack_failed
/// [`RabbitMQError::reject_failed`]: rabbitmq_error::RabbitMQError::reject_failed
/// [`RabbitMQError::cancel_failed`]: rabbitmq_error::RabbitMQError::cancel_failed
/// [`RabbitMQError::channel_closed`]: rabbitmq_error::RabbitMQError::channel_closed
#[cfg_attr(test, mockall::automock)]
pub trait Channel: Send + Sync {
    /// Positively acknowledges a single delivery.
    fn acknowledge(&self, delivery_tag: u64) -> RabbitMQResult<()>;

    /// Negatively acknowledges a single delivery, optionally asking the broker
    /// to requeue it.
    fn reject(&self, delivery_tag: u64, requeue: bool) -> RabbitMQResult<()>;

    /// Asks the broker to stop delivering to the given subscription.
    fn cancel(&self, consumer_tag: &CheetahString) -> RabbitMQResult<()>;
}

pub type ArcChannel = Arc<dyn Channel>;
