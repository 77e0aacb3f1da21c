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

use cheetah_string::CheetahString;
use rabbitmq_error::RabbitMQResult;

use crate::envelope::DeliveryEnvelope;
use crate::shutdown::ShutdownReason;

/// Callbacks through which the protocol layer drives a consumer.
///
/// All callbacks run on the protocol's dispatch thread and must return
/// promptly; none of them blocks on application threads.
pub trait BasicConsumer: Send + Sync {
    /// The broker accepted the subscription under `consumer_tag`.
    fn handle_consume_ok(&self, consumer_tag: CheetahString) -> RabbitMQResult<()>;

    /// A message arrived for this subscription.
    fn handle_deliver(&self, envelope: DeliveryEnvelope) -> RabbitMQResult<()>;

    /// The broker cancelled the subscription, e.g. because its queue was
    /// deleted.
    fn handle_cancel(&self, consumer_tag: &CheetahString);

    /// An unsubscribe requested by this client was confirmed.
    fn handle_cancel_ok(&self, consumer_tag: &CheetahString);

    /// The channel or connection carrying the subscription shut down.
    fn handle_shutdown(&self, reason: ShutdownReason);
}
