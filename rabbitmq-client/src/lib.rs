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

//! Consumer-side delivery buffering for RabbitMQ.
//!
//! The protocol layer pushes deliveries into a consumer through
//! [`BasicConsumer`](consumer::basic_consumer::BasicConsumer); application
//! threads pull them back out with the dequeue family of operations. The
//! acknowledgment policy (auto, manual or transactional) is chosen when the
//! consumer is built.

pub mod base;
pub mod channel;
pub mod consumer;
pub mod envelope;
pub mod shutdown;
pub mod transaction;

pub use crate::base::consumer_config::ConsumerConfig;
pub use crate::channel::Channel;
pub use crate::consumer::ack_policy::AckMode;
pub use crate::consumer::basic_consumer::BasicConsumer;
pub use crate::consumer::delivery_consumer::AutoAckConsumer;
pub use crate::consumer::delivery_consumer::DeliveryConsumer;
pub use crate::consumer::delivery_consumer::ManualAckConsumer;
pub use crate::consumer::message_acknowledge_handler::MessageAcknowledgeHandler;
pub use crate::consumer::subscriber::Received;
pub use crate::consumer::subscriber::Subscriber;
pub use crate::consumer::transactional_consumer::TransactionalConsumer;
pub use crate::envelope::BasicProperties;
pub use crate::envelope::DeliveryEnvelope;
pub use crate::shutdown::ShutdownReason;
pub use crate::transaction::Transaction;
