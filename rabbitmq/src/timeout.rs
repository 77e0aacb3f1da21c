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

use std::time::Duration;
use std::time::Instant;

/// How long a blocking queue operation may wait.
///
/// `Infinite` is a distinct value rather than a very long duration: a dequeue
/// with `Timeout::INFINITE` is the unbounded dequeue. Durations too large to be
/// represented as a deadline are treated the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Timeout {
    /// Wait until an item arrives or the queue closes.
    #[default]
    Infinite,
    /// Wait at most this long, measured from call entry.
    After(Duration),
}

impl Timeout {
    pub const INFINITE: Timeout = Timeout::Infinite;

    /// Do not wait at all.
    pub const ZERO: Timeout = Timeout::After(Duration::ZERO);

    /// Builds a timeout from a signed millisecond count. Zero and negative
    /// values mean "do not wait".
    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        if millis <= 0 {
            Timeout::ZERO
        } else {
            Timeout::After(Duration::from_millis(millis as u64))
        }
    }

    #[inline]
    pub fn is_infinite(&self) -> bool {
        matches!(self, Timeout::Infinite)
    }

    /// The instant at which a wait started at `start` gives up, or `None` if it
    /// never does.
    #[inline]
    pub fn deadline(&self, start: Instant) -> Option<Instant> {
        match self {
            Timeout::Infinite => None,
            Timeout::After(duration) => start.checked_add(*duration),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        if duration == Duration::MAX {
            Timeout::Infinite
        } else {
            Timeout::After(duration)
        }
    }
}
