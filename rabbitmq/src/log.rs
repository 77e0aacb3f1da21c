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
use std::str::FromStr;

use rabbitmq_error::RabbitMQError;
use rabbitmq_error::RabbitMQResult;

/// Initializes the logger.
///
/// Reads the log level from the `RUST_LOG` environment variable, defaulting
/// to "INFO" if not set. Output includes thread names, log levels, line
/// numbers and thread IDs. Installing a second subscriber is a no-op.
pub fn init_logger() -> RabbitMQResult<()> {
    let level = std::env::var("RUST_LOG").unwrap_or(String::from("INFO"));
    let level = Level::from_str(level.as_str())?;
    init_logger_with_level(level);
    Ok(())
}

pub fn init_logger_with_level(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_thread_names(true)
        .with_level(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_max_level(level.as_tracing())
        .try_init();
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Level(&'static str);

impl Level {
    pub const ERROR: Level = Level("ERROR");

    pub const WARN: Level = Level("WARN");

    pub const INFO: Level = Level("INFO");

    pub const DEBUG: Level = Level("DEBUG");

    pub const TRACE: Level = Level("TRACE");

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    fn as_tracing(&self) -> tracing::Level {
        match self.0 {
            "ERROR" => tracing::Level::ERROR,
            "WARN" => tracing::Level::WARN,
            "DEBUG" => tracing::Level::DEBUG,
            "TRACE" => tracing::Level::TRACE,
            _ => tracing::Level::INFO,
        }
    }
}

impl FromStr for Level {
    type Err = RabbitMQError;

    fn from_str(level: &str) -> Result<Self, Self::Err> {
        match level.to_ascii_uppercase().as_str() {
            "ERROR" => Ok(Level::ERROR),
            "WARN" => Ok(Level::WARN),
            "INFO" => Ok(Level::INFO),
            "DEBUG" => Ok(Level::DEBUG),
            "TRACE" => Ok(Level::TRACE),
            _ => Err(RabbitMQError::config_invalid_value(
                "RUST_LOG",
                level,
                "expected one of ERROR, WARN, INFO, DEBUG, TRACE",
            )),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_from_str_creates_correct_level() {
        assert_eq!(Level::from_str("ERROR").unwrap(), Level::ERROR);
        assert_eq!(Level::from_str("warn").unwrap(), Level::WARN);
        assert_eq!(Level::from_str("Info").unwrap(), Level::INFO);
        assert_eq!(Level::from_str("DEBUG").unwrap(), Level::DEBUG);
        assert_eq!(Level::from_str("trace").unwrap(), Level::TRACE);
    }

    #[test]
    fn level_from_str_rejects_unknown_level() {
        let err = Level::from_str("VERBOSE").unwrap_err();
        assert!(matches!(err, RabbitMQError::ConfigInvalidValue { key: "RUST_LOG", .. }));
    }

    #[test]
    fn level_display_formats_correctly() {
        assert_eq!(format!("{}", Level::ERROR), "ERROR");
        assert_eq!(format!("{:>5}", Level::WARN), " WARN");
    }

    #[test]
    fn init_logger_twice_is_harmless() {
        init_logger_with_level(Level::DEBUG);
        init_logger_with_level(Level::INFO);
    }
}
