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

use std::path::Path;

use cheetah_string::CheetahString;
use config::Config;
use rabbitmq_error::RabbitMQError;
use rabbitmq_error::RabbitMQResult;
use rabbitmq_rust::Timeout;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use super::consumer_config_builder::ConsumerConfigBuilder;
use super::consumer_config_validation::ConsumerConfigValidator;
use crate::consumer::ack_policy::AckMode;

/// Prefix of environment variables overriding file settings, e.g.
/// `RABBITMQ_CONSUMER_ACK_MODE=auto`.
pub const ENV_PREFIX: &str = "RABBITMQ_CONSUMER";

pub const DEFAULT_RECEIVE_TIMEOUT_MILLIS: i64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    pub ack_mode: AckMode,
    /// Wait applied by [`Subscriber::receive`](crate::Subscriber::receive).
    /// Zero or negative means do not wait.
    pub receive_timeout_millis: i64,
    pub requeue_on_failure: bool,
    pub consumer_tag: Option<CheetahString>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        ConsumerConfig {
            ack_mode: AckMode::default(),
            receive_timeout_millis: DEFAULT_RECEIVE_TIMEOUT_MILLIS,
            requeue_on_failure: true,
            consumer_tag: None,
        }
    }
}

impl ConsumerConfig {
    pub fn builder() -> ConsumerConfigBuilder {
        ConsumerConfigBuilder::new()
    }

    #[inline]
    pub fn receive_timeout(&self) -> Timeout {
        Timeout::from_millis(self.receive_timeout_millis)
    }

    /// Loads the configuration from `path`, with `RABBITMQ_CONSUMER_*`
    /// environment variables taking precedence over the file.
    pub fn load(path: impl AsRef<Path>) -> RabbitMQResult<Self> {
        let path = path.as_ref();
        let config = Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .map_err(|err| RabbitMQError::config_parse_failed("consumer", err.to_string()))?
            .try_deserialize::<ConsumerConfig>()
            .map_err(|err| RabbitMQError::config_parse_failed("consumer", err.to_string()))?;
        config.validate()?;
        info!(
            "consumer config loaded from {}: ack_mode={}, receive_timeout_millis={}",
            path.display(),
            config.ack_mode,
            config.receive_timeout_millis
        );
        Ok(config)
    }

    pub fn validate(&self) -> RabbitMQResult<()> {
        if let Some(consumer_tag) = &self.consumer_tag {
            ConsumerConfigValidator::validate_consumer_tag(consumer_tag.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn defaults() {
        let config = ConsumerConfig::default();
        assert_eq!(config.ack_mode, AckMode::Manual);
        assert_eq!(config.receive_timeout(), Timeout::After(Duration::from_secs(60)));
        assert!(config.requeue_on_failure);
        assert!(config.consumer_tag.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn negative_receive_timeout_does_not_wait() {
        let config = ConsumerConfig {
            receive_timeout_millis: -1,
            ..ConsumerConfig::default()
        };
        assert_eq!(config.receive_timeout(), Timeout::ZERO);
    }

    #[test]
    fn empty_consumer_tag_is_invalid() {
        let config = ConsumerConfig {
            consumer_tag: Some(CheetahString::from_slice("")),
            ..ConsumerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RabbitMQError::ConfigInvalidValue { key: "consumer_tag", .. })
        ));
    }

    #[test]
    fn missing_file_is_parse_failure() {
        let err = ConsumerConfig::load("/nonexistent/rabbitmq-consumer.toml").unwrap_err();
        assert!(matches!(err, RabbitMQError::ConfigParseFailed { key: "consumer", .. }));
    }
}
