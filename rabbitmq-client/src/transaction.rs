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

//! Explicit transaction handles for transactional acknowledgment.
//!
//! A [`Transaction`] is created by the application and passed to every
//! dequeue that should be settled by its outcome. Each enlisted participant
//! learns the outcome exactly once: commit, rollback, or in-doubt.

use std::fmt::Display;

use parking_lot::Mutex;
use rabbitmq_error::RabbitMQError;
use rabbitmq_error::RabbitMQResult;
use tracing::debug;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionStatus {
    #[default]
    Active,
    /// Commit, rollback or in-doubt notification in progress
    Completing,
    Committed,
    RolledBack,
    InDoubt,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Active => "ACTIVE",
            TransactionStatus::Completing => "COMPLETING",
            TransactionStatus::Committed => "COMMITTED",
            TransactionStatus::RolledBack => "ROLLED_BACK",
            TransactionStatus::InDoubt => "IN_DOUBT",
        }
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource taking part in a [`Transaction`].
pub trait EnlistmentNotification: Send {
    /// First phase of commit. Returning an error aborts the transaction and
    /// every participant is rolled back instead.
    fn prepare(&self) -> RabbitMQResult<()> {
        Ok(())
    }

    fn commit(&self) -> RabbitMQResult<()>;

    fn rollback(&self) -> RabbitMQResult<()>;

    /// The outcome is unknown. Participants must neither commit nor roll back.
    fn in_doubt(&self) {}
}

struct Inner {
    status: TransactionStatus,
    participants: Vec<Box<dyn EnlistmentNotification>>,
}

/// A unit of work whose outcome settles every enlisted participant.
///
/// Dropping a transaction that is still active rolls it back.
pub struct Transaction {
    inner: Mutex<Inner>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    pub fn new() -> Self {
        Transaction {
            inner: Mutex::new(Inner {
                status: TransactionStatus::Active,
                participants: Vec::new(),
            }),
        }
    }

    pub fn status(&self) -> TransactionStatus {
        self.inner.lock().status
    }

    pub fn is_active(&self) -> bool {
        self.status() == TransactionStatus::Active
    }

    pub fn ensure_active(&self) -> RabbitMQResult<()> {
        let status = self.status();
        if status != TransactionStatus::Active {
            return Err(RabbitMQError::transaction_not_active(status.as_str()));
        }
        Ok(())
    }

    /// Number of enlisted participants not yet notified.
    pub fn enlisted(&self) -> usize {
        self.inner.lock().participants.len()
    }

    pub fn enlist(&self, participant: Box<dyn EnlistmentNotification>) -> RabbitMQResult<()> {
        let mut inner = self.inner.lock();
        if inner.status != TransactionStatus::Active {
            return Err(RabbitMQError::transaction_not_active(inner.status.as_str()));
        }
        inner.participants.push(participant);
        Ok(())
    }

    /// Two-phase commit: prepares every participant, then commits them all.
    ///
    /// If a participant fails to prepare, every participant is rolled back and
    /// [`TransactionError::Aborted`](rabbitmq_error::TransactionError::Aborted)
    /// is returned. Otherwise every participant is committed even if some
    /// commit fails; the first failure is returned.
    pub fn commit(&self) -> RabbitMQResult<()> {
        let participants = self.begin_completion()?;
        let prepared = participants.iter().try_for_each(|participant| participant.prepare());
        if let Err(err) = prepared {
            warn!("transaction aborted during prepare, rolling back: {}", err);
            let rolled_back = notify_all(&participants, |participant| participant.rollback());
            self.finish(TransactionStatus::RolledBack);
            rolled_back?;
            return Err(RabbitMQError::transaction_aborted(err.to_string()));
        }
        let committed = notify_all(&participants, |participant| participant.commit());
        self.finish(TransactionStatus::Committed);
        debug!("transaction committed, {} participant(s)", participants.len());
        committed
    }

    /// Rolls back every participant. The first failure is returned.
    pub fn rollback(&self) -> RabbitMQResult<()> {
        let participants = self.begin_completion()?;
        let rolled_back = notify_all(&participants, |participant| participant.rollback());
        self.finish(TransactionStatus::RolledBack);
        debug!("transaction rolled back, {} participant(s)", participants.len());
        rolled_back
    }

    /// Completes the transaction with an unknown outcome. Participants are
    /// told, and take no action.
    pub fn mark_in_doubt(&self) -> RabbitMQResult<()> {
        let participants = self.begin_completion()?;
        for participant in &participants {
            participant.in_doubt();
        }
        self.finish(TransactionStatus::InDoubt);
        warn!("transaction in doubt, {} participant(s) left unsettled", participants.len());
        Ok(())
    }

    fn begin_completion(&self) -> RabbitMQResult<Vec<Box<dyn EnlistmentNotification>>> {
        let mut inner = self.inner.lock();
        if inner.status != TransactionStatus::Active {
            return Err(RabbitMQError::transaction_not_active(inner.status.as_str()));
        }
        inner.status = TransactionStatus::Completing;
        Ok(std::mem::take(&mut inner.participants))
    }

    fn finish(&self, status: TransactionStatus) {
        self.inner.lock().status = status;
    }

    /// Rolls back a transaction that is being discarded while still active.
    fn abandon(&mut self) {
        let inner = self.inner.get_mut();
        if inner.status != TransactionStatus::Active {
            return;
        }
        inner.status = TransactionStatus::RolledBack;
        if inner.participants.is_empty() {
            return;
        }
        warn!(
            "transaction dropped while active, rolling back {} participant(s)",
            inner.participants.len()
        );
        let participants = std::mem::take(&mut inner.participants);
        if let Err(err) = notify_all(&participants, |participant| participant.rollback()) {
            warn!("implicit rollback failed: {}", err);
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        self.abandon();
    }
}

/// Notifies every participant, returning the first failure.
fn notify_all<F>(participants: &[Box<dyn EnlistmentNotification>], notify: F) -> RabbitMQResult<()>
where
    F: Fn(&dyn EnlistmentNotification) -> RabbitMQResult<()>,
{
    let mut first_error = None;
    for participant in participants {
        if let Err(err) = notify(participant.as_ref()) {
            warn!("transaction participant failed: {}", err);
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}
