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

//! Unified error system for the RabbitMQ Rust consumer layer
//!
//! Every fallible operation in the workspace returns [`RabbitMQResult`]. Errors
//! raised by the protocol channel and by transactions live in their own
//! category enums and convert into [`RabbitMQError`] through `From`.

mod channel;
mod transaction;

pub use channel::ChannelError;
use thiserror::Error;
pub use transaction::TransactionError;

/// Main error type for all RabbitMQ consumer operations
///
/// `QueueClosed` is the end-of-stream signal of a delivery queue: it is never
/// retried internally and callers treat it as "no more deliveries, ever". A
/// timed out dequeue is not an error at all and is reported as `Ok(None)`.
#[derive(Debug, Error)]
pub enum RabbitMQError {
    // ============================================================================
    // Queue Errors
    // ============================================================================
    /// The queue is closed (and, for dequeue operations, drained)
    #[error("Queue closed")]
    QueueClosed,

    // ============================================================================
    // Channel Errors
    // ============================================================================
    /// Protocol channel errors (acknowledge, reject, cancel, channel shutdown)
    #[error(transparent)]
    Channel(#[from] ChannelError),

    // ============================================================================
    // Transaction Errors
    // ============================================================================
    /// Transaction lifecycle errors (inactive transaction, aborted prepare)
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    // ============================================================================
    // Consumer Errors
    // ============================================================================
    /// Invalid consumer lifecycle state
    #[error("Invalid consumer state: expected {expected}, got {actual}")]
    ConsumerInvalidState { expected: &'static str, actual: String },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// Configuration parsing failed
    #[error("Configuration parse error for '{key}': {reason}")]
    ConfigParseFailed { key: &'static str, reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration for '{key}': value='{value}', reason={reason}")]
    ConfigInvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Result type alias for RabbitMQ operations
pub type RabbitMQResult<T> = std::result::Result<T, RabbitMQError>;

/// Simplified result type
pub type Result<T> = RabbitMQResult<T>;

impl RabbitMQError {
    /// Create an acknowledge failed error
    #[inline]
    pub fn ack_failed(delivery_tag: u64, reason: impl Into<String>) -> Self {
        Self::Channel(ChannelError::ack_failed(delivery_tag, reason))
    }

    /// Create a reject failed error
    #[inline]
    pub fn reject_failed(delivery_tag: u64, requeue: bool, reason: impl Into<String>) -> Self {
        Self::Channel(ChannelError::reject_failed(delivery_tag, requeue, reason))
    }

    /// Create a cancel failed error
    #[inline]
    pub fn cancel_failed(consumer_tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Channel(ChannelError::CancelFailed {
            consumer_tag: consumer_tag.into(),
            reason: reason.into(),
        })
    }

    /// Create a channel closed error
    #[inline]
    pub fn channel_closed(reply_code: u16, reply_text: impl Into<String>) -> Self {
        Self::Channel(ChannelError::Closed {
            reply_code,
            reply_text: reply_text.into(),
        })
    }

    /// Create a transaction not active error
    #[inline]
    pub fn transaction_not_active(state: &'static str) -> Self {
        Self::Transaction(TransactionError::NotActive { state })
    }

    /// Create a transaction aborted error
    #[inline]
    pub fn transaction_aborted(reason: impl Into<String>) -> Self {
        Self::Transaction(TransactionError::Aborted { reason: reason.into() })
    }

    /// Create an invalid consumer state error
    #[inline]
    pub fn consumer_invalid_state(expected: &'static str, actual: impl Into<String>) -> Self {
        Self::ConsumerInvalidState {
            expected,
            actual: actual.into(),
        }
    }

    /// Create a config parse error
    #[inline]
    pub fn config_parse_failed(key: &'static str, reason: impl Into<String>) -> Self {
        Self::ConfigParseFailed {
            key,
            reason: reason.into(),
        }
    }

    /// Create an invalid config value error
    #[inline]
    pub fn config_invalid_value(key: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalidValue {
            key,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error is the end-of-stream signal of a closed queue
    #[inline]
    pub fn is_queue_closed(&self) -> bool {
        matches!(self, Self::QueueClosed)
    }

    /// The delivery tag an acknowledgment error refers to, if any
    pub fn delivery_tag(&self) -> Option<u64> {
        match self {
            Self::Channel(err) => err.delivery_tag(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_closed_display() {
        let err = RabbitMQError::QueueClosed;
        assert_eq!(err.to_string(), "Queue closed");
        assert!(err.is_queue_closed());
    }

    #[test]
    fn test_error_conversion() {
        let err: RabbitMQError = ChannelError::Closed {
            reply_code: 320,
            reply_text: "CONNECTION_FORCED".to_string(),
        }
        .into();
        assert!(matches!(err, RabbitMQError::Channel(ChannelError::Closed { .. })));
        assert!(!err.is_queue_closed());
    }

    #[test]
    fn test_ack_failed_carries_delivery_tag() {
        let err = RabbitMQError::ack_failed(42, "connection reset");
        assert_eq!(err.delivery_tag(), Some(42));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_cancel_failed_has_no_delivery_tag() {
        let err = RabbitMQError::cancel_failed("amq.ctag-1", "channel closed");
        assert_eq!(err.delivery_tag(), None);
        assert!(err.to_string().contains("amq.ctag-1"));
    }

    #[test]
    fn test_config_invalid_value() {
        let err = RabbitMQError::config_invalid_value("consumer_tag", "", "must not be empty");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for 'consumer_tag': value='', reason=must not be empty"
        );
    }
}
