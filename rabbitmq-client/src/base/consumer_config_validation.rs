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

//! Consumer configuration validation module

use rabbitmq_error::RabbitMQError;
use rabbitmq_error::RabbitMQResult;

/// Validator for ConsumerConfig fields
pub struct ConsumerConfigValidator;

impl ConsumerConfigValidator {
    /// Longest consumer tag the protocol can carry (short string)
    pub const MAX_CONSUMER_TAG_LENGTH: usize = 255;

    /// Validate consumer tag
    ///
    /// Ensures the tag is non-empty and fits in a protocol short string.
    pub fn validate_consumer_tag(consumer_tag: &str) -> RabbitMQResult<()> {
        if consumer_tag.is_empty() {
            return Err(RabbitMQError::config_invalid_value(
                "consumer_tag",
                consumer_tag,
                "must not be empty",
            ));
        }
        if consumer_tag.len() > Self::MAX_CONSUMER_TAG_LENGTH {
            return Err(RabbitMQError::config_invalid_value(
                "consumer_tag",
                consumer_tag,
                format!("must be at most {} bytes", Self::MAX_CONSUMER_TAG_LENGTH),
            ));
        }
        Ok(())
    }
}
