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

//! Protocol channel errors

use thiserror::Error;

/// Errors reported by the protocol channel a consumer is bound to
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Positive acknowledgment could not be delivered
    #[error("Acknowledge failed for delivery tag {delivery_tag}: {reason}")]
    AckFailed { delivery_tag: u64, reason: String },

    /// Negative acknowledgment could not be delivered
    #[error("Reject failed for delivery tag {delivery_tag} (requeue={requeue}): {reason}")]
    RejectFailed {
        delivery_tag: u64,
        requeue: bool,
        reason: String,
    },

    /// Subscription cancel request failed
    #[error("Cancel failed for consumer '{consumer_tag}': {reason}")]
    CancelFailed { consumer_tag: String, reason: String },

    /// Channel was closed by the peer or the library
    #[error("Channel closed: code={reply_code}, text={reply_text}")]
    Closed { reply_code: u16, reply_text: String },
}

impl ChannelError {
    /// Create an acknowledge failed error
    #[inline]
    pub fn ack_failed(delivery_tag: u64, reason: impl Into<String>) -> Self {
        Self::AckFailed {
            delivery_tag,
            reason: reason.into(),
        }
    }

    /// Create a reject failed error
    #[inline]
    pub fn reject_failed(delivery_tag: u64, requeue: bool, reason: impl Into<String>) -> Self {
        Self::RejectFailed {
            delivery_tag,
            requeue,
            reason: reason.into(),
        }
    }

    /// Get the associated delivery tag if available
    pub fn delivery_tag(&self) -> Option<u64> {
        match self {
            Self::AckFailed { delivery_tag, .. } | Self::RejectFailed { delivery_tag, .. } => Some(*delivery_tag),
            Self::CancelFailed { .. } | Self::Closed { .. } => None,
        }
    }
}
