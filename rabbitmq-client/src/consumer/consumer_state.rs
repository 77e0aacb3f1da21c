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

use std::fmt::Display;

/// Lifecycle of a consumer subscription.
///
/// `Created → Consuming → Canceled`, or `Consuming → TransportLost → Canceled`.
/// `Canceled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsumerState {
    #[default]
    Created,
    Consuming,
    TransportLost,
    Canceled,
}

impl ConsumerState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        self == ConsumerState::Canceled
    }
}

impl Display for ConsumerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsumerState::Created => write!(f, "CREATED"),
            ConsumerState::Consuming => write!(f, "CONSUMING"),
            ConsumerState::TransportLost => write!(f, "TRANSPORT_LOST"),
            ConsumerState::Canceled => write!(f, "CANCELED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_canceled_is_terminal() {
        assert!(!ConsumerState::Created.is_terminal());
        assert!(!ConsumerState::Consuming.is_terminal());
        assert!(!ConsumerState::TransportLost.is_terminal());
        assert!(ConsumerState::Canceled.is_terminal());
    }

    #[test]
    fn consumer_state_display() {
        assert_eq!(format!("{}", ConsumerState::TransportLost), "TRANSPORT_LOST");
        assert_eq!(format!("{}", ConsumerState::default()), "CREATED");
    }
}
