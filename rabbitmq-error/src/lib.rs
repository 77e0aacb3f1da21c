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

//! # RabbitMQ Error Handling System
//!
//! A single error type shared by every crate of the workspace. Errors are
//! grouped into categories (channel, transaction) with rich context so that a
//! failed acknowledgment can always be traced back to its delivery tag.
//!
//! ```rust
//! use rabbitmq_error::RabbitMQError;
//! use rabbitmq_error::RabbitMQResult;
//!
//! fn acknowledge(delivery_tag: u64, connected: bool) -> RabbitMQResult<()> {
//!     if !connected {
//!         return Err(RabbitMQError::ack_failed(delivery_tag, "connection reset"));
//!     }
//!     Ok(())
//! }
//! # acknowledge(1, true).unwrap();
//! ```

pub mod unified;

pub use unified::ChannelError;
pub use unified::RabbitMQError;
pub use unified::RabbitMQResult;
pub use unified::Result;
pub use unified::TransactionError;
