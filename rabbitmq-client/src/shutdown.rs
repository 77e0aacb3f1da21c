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

use cheetah_string::CheetahString;

/// AMQP reply code of a normal, non-error close.
pub const REPLY_SUCCESS: u16 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownInitiator {
    /// The application closed the channel or connection.
    Application,
    /// The client library closed it, e.g. after a protocol error.
    Library,
    /// The broker closed it.
    Peer,
}

impl Display for ShutdownInitiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownInitiator::Application => write!(f, "APPLICATION"),
            ShutdownInitiator::Library => write!(f, "LIBRARY"),
            ShutdownInitiator::Peer => write!(f, "PEER"),
        }
    }
}

/// Why the transport under a consumer went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReason {
    initiator: ShutdownInitiator,
    reply_code: u16,
    reply_text: CheetahString,
}

impl ShutdownReason {
    pub fn new(initiator: ShutdownInitiator, reply_code: u16, reply_text: impl Into<CheetahString>) -> Self {
        ShutdownReason {
            initiator,
            reply_code,
            reply_text: reply_text.into(),
        }
    }

    /// A normal close requested by the application.
    pub fn application() -> Self {
        Self::new(ShutdownInitiator::Application, REPLY_SUCCESS, "Goodbye")
    }

    #[inline]
    pub fn initiator(&self) -> ShutdownInitiator {
        self.initiator
    }

    #[inline]
    pub fn reply_code(&self) -> u16 {
        self.reply_code
    }

    #[inline]
    pub fn reply_text(&self) -> &CheetahString {
        &self.reply_text
    }

    /// `true` if the channel closed normally rather than faulting.
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.reply_code == REPLY_SUCCESS
    }
}

impl Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ShutdownReason [initiator={}, code={}, text={}]",
            self.initiator, self.reply_code, self.reply_text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_shutdown_is_clean() {
        let reason = ShutdownReason::application();
        assert!(reason.is_clean());
        assert_eq!(reason.initiator(), ShutdownInitiator::Application);
    }

    #[test]
    fn forced_shutdown_is_not_clean() {
        let reason = ShutdownReason::new(ShutdownInitiator::Peer, 320, "CONNECTION_FORCED");
        assert!(!reason.is_clean());
        assert_eq!(
            format!("{}", reason),
            "ShutdownReason [initiator=PEER, code=320, text=CONNECTION_FORCED]"
        );
    }
}
