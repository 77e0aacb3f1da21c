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

//! Transaction errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransactionError {
    /// Operation issued on a transaction that already completed
    #[error("Transaction is not active: {state}")]
    NotActive { state: &'static str },

    /// A participant voted to abort during prepare
    #[error("Transaction aborted: {reason}")]
    Aborted { reason: String },
}
