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

//! ConsumerConfig builder module

use cheetah_string::CheetahString;
use rabbitmq_error::RabbitMQResult;

use super::consumer_config::ConsumerConfig;
use crate::consumer::ack_policy::AckMode;

/// Builder for creating [`ConsumerConfig`] instances with a fluent API
///
/// # Example
///
/// ```rust
/// use rabbitmq_client_rust::AckMode;
/// use rabbitmq_client_rust::ConsumerConfig;
///
/// let config = ConsumerConfig::builder()
///     .ack_mode(AckMode::Transactional)
///     .receive_timeout_millis(5_000)
///     .consumer_tag("billing-worker")
///     .build()
///     .unwrap();
/// assert_eq!(config.ack_mode, AckMode::Transactional);
/// ```
pub struct ConsumerConfigBuilder {
    config: ConsumerConfig,
}

impl Default for ConsumerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ConsumerConfig::default(),
        }
    }

    pub fn ack_mode(mut self, ack_mode: AckMode) -> Self {
        self.config.ack_mode = ack_mode;
        self
    }

    /// Sets the receive timeout in milliseconds. Zero or negative disables
    /// waiting.
    pub fn receive_timeout_millis(mut self, millis: i64) -> Self {
        self.config.receive_timeout_millis = millis;
        self
    }

    pub fn requeue_on_failure(mut self, requeue: bool) -> Self {
        self.config.requeue_on_failure = requeue;
        self
    }

    pub fn consumer_tag(mut self, consumer_tag: impl Into<CheetahString>) -> Self {
        self.config.consumer_tag = Some(consumer_tag.into());
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> RabbitMQResult<ConsumerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without validation.
    pub fn build_unchecked(self) -> ConsumerConfig {
        self.config
    }
}
