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

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use cheetah_string::CheetahString;
use parking_lot::Mutex;
use rabbitmq_client_rust::shutdown::ShutdownInitiator;
use rabbitmq_client_rust::AutoAckConsumer;
use rabbitmq_client_rust::BasicConsumer;
use rabbitmq_client_rust::BasicProperties;
use rabbitmq_client_rust::Channel;
use rabbitmq_client_rust::DeliveryEnvelope;
use rabbitmq_client_rust::ManualAckConsumer;
use rabbitmq_client_rust::MessageAcknowledgeHandler;
use rabbitmq_client_rust::ShutdownReason;
use rabbitmq_client_rust::Transaction;
use rabbitmq_client_rust::TransactionalConsumer;
use rabbitmq_error::ChannelError;
use rabbitmq_error::RabbitMQError;
use rabbitmq_error::RabbitMQResult;
use rabbitmq_rust::Timeout;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Ack(u64),
    Reject(u64, bool),
    Cancel(String),
}

#[derive(Default)]
struct RecordingChannel {
    calls: Mutex<Vec<Call>>,
    closed: bool,
}

impl RecordingChannel {
    fn closed() -> Self {
        RecordingChannel {
            calls: Mutex::default(),
            closed: true,
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

impl Channel for RecordingChannel {
    fn acknowledge(&self, delivery_tag: u64) -> RabbitMQResult<()> {
        if self.closed {
            return Err(RabbitMQError::ack_failed(delivery_tag, "connection reset by peer"));
        }
        self.calls.lock().push(Call::Ack(delivery_tag));
        Ok(())
    }

    fn reject(&self, delivery_tag: u64, requeue: bool) -> RabbitMQResult<()> {
        if self.closed {
            return Err(RabbitMQError::reject_failed(delivery_tag, requeue, "connection reset by peer"));
        }
        self.calls.lock().push(Call::Reject(delivery_tag, requeue));
        Ok(())
    }

    fn cancel(&self, consumer_tag: &CheetahString) -> RabbitMQResult<()> {
        if self.closed {
            return Err(RabbitMQError::channel_closed(320, "CONNECTION_FORCED"));
        }
        self.calls.lock().push(Call::Cancel(consumer_tag.to_string()));
        Ok(())
    }
}

fn delivery(delivery_tag: u64) -> DeliveryEnvelope {
    DeliveryEnvelope::new(
        "ctag-it",
        delivery_tag,
        false,
        "amq.topic",
        "metrics.cpu",
        BasicProperties::default(),
        delivery_tag.to_be_bytes().to_vec(),
    )
}

#[test]
fn auto_ack_acknowledges_before_handing_over() {
    let channel = Arc::new(RecordingChannel::default());
    let consumer = AutoAckConsumer::new(channel.clone());
    consumer.handle_consume_ok("ctag-it".into()).unwrap();
    consumer.handle_deliver(delivery(1)).unwrap();
    consumer.handle_deliver(delivery(2)).unwrap();

    let first = consumer.dequeue().unwrap();
    assert_eq!(channel.calls(), vec![Call::Ack(first.delivery_tag())]);
    consumer.dequeue().unwrap();
    assert_eq!(channel.calls(), vec![Call::Ack(1), Call::Ack(2)]);
}

#[test]
fn auto_ack_failure_is_surfaced() {
    let consumer = AutoAckConsumer::new(Arc::new(RecordingChannel::closed()));
    consumer.handle_deliver(delivery(7)).unwrap();
    let err = consumer.dequeue().unwrap_err();
    assert!(!err.is_queue_closed());
    assert_eq!(err.delivery_tag(), Some(7));
}

#[test]
fn manual_ack_leaves_settlement_to_the_caller() {
    let channel = Arc::new(RecordingChannel::default());
    let consumer = ManualAckConsumer::new(channel.clone());
    consumer.handle_deliver(delivery(3)).unwrap();
    let envelope = consumer.dequeue().unwrap();
    assert!(channel.calls().is_empty());
    consumer.channel().acknowledge(envelope.delivery_tag()).unwrap();
    assert_eq!(channel.calls(), vec![Call::Ack(3)]);
}

#[test]
fn transactional_commit_acks_and_rollback_requeues() {
    let channel = Arc::new(RecordingChannel::default());
    let consumer = TransactionalConsumer::new(channel.clone());
    for tag in 1..=2 {
        consumer.handle_deliver(delivery(tag)).unwrap();
    }

    let committed = Transaction::new();
    consumer.dequeue(&committed).unwrap();
    committed.commit().unwrap();

    let rolled_back = Transaction::new();
    consumer.dequeue(&rolled_back).unwrap();
    rolled_back.rollback().unwrap();

    assert_eq!(channel.calls(), vec![Call::Ack(1), Call::Reject(2, true)]);
}

#[test]
fn transaction_dropped_while_active_requeues() {
    let channel = Arc::new(RecordingChannel::default());
    let consumer = TransactionalConsumer::new(channel.clone());
    consumer.handle_deliver(delivery(5)).unwrap();
    {
        let txn = Transaction::new();
        consumer.dequeue(&txn).unwrap();
    }
    assert_eq!(channel.calls(), vec![Call::Reject(5, true)]);
}

#[test]
fn in_doubt_transaction_settles_nothing() {
    let channel = Arc::new(RecordingChannel::default());
    let consumer = TransactionalConsumer::new(channel.clone());
    consumer.handle_deliver(delivery(6)).unwrap();
    let txn = Transaction::new();
    consumer.dequeue(&txn).unwrap();
    txn.mark_in_doubt().unwrap();
    assert!(txn.commit().is_err());
    assert!(channel.calls().is_empty());
}

#[test]
fn transaction_completed_elsewhere_requeues_the_delivery() {
    let channel = Arc::new(RecordingChannel::default());
    let consumer = Arc::new(TransactionalConsumer::new(channel.clone()));
    let txn = Arc::new(Transaction::new());

    let waiter = {
        let consumer = Arc::clone(&consumer);
        let txn = Arc::clone(&txn);
        thread::spawn(move || consumer.dequeue_timeout(Duration::from_secs(5), &txn))
    };
    thread::sleep(Duration::from_millis(100));
    txn.rollback().unwrap();
    consumer.handle_deliver(delivery(8)).unwrap();

    assert!(waiter.join().unwrap().is_err());
    assert_eq!(channel.calls(), vec![Call::Reject(8, true)]);
}

#[test]
fn cancel_releases_every_blocked_thread() {
    let channel = Arc::new(RecordingChannel::default());
    let consumer = Arc::new(ManualAckConsumer::new(channel.clone()));
    consumer.handle_consume_ok("ctag-it".into()).unwrap();

    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let consumer = Arc::clone(&consumer);
            thread::spawn(move || consumer.dequeue())
        })
        .collect();
    thread::sleep(Duration::from_millis(100));

    let started = Instant::now();
    consumer.cancel().unwrap();
    for waiter in waiters {
        assert!(waiter.join().unwrap().unwrap_err().is_queue_closed());
    }
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(channel.calls(), vec![Call::Cancel("ctag-it".to_string())]);
}

#[test]
fn transport_loss_drains_then_closes() {
    let channel = Arc::new(RecordingChannel::default());
    let consumer = AutoAckConsumer::new(channel.clone());
    consumer.handle_consume_ok("ctag-it".into()).unwrap();
    for tag in 1..=3 {
        consumer.handle_deliver(delivery(tag)).unwrap();
    }
    consumer.handle_shutdown(ShutdownReason::new(ShutdownInitiator::Peer, 320, "CONNECTION_FORCED"));

    let drained: Vec<u64> = consumer
        .deliveries()
        .map(|delivery| delivery.unwrap().delivery_tag())
        .collect();
    assert_eq!(drained, vec![1, 2, 3]);
    assert!(consumer.dequeue_timeout(Timeout::INFINITE).unwrap_err().is_queue_closed());
    assert!(!consumer.shutdown_reason().unwrap().is_clean());
    assert_eq!(channel.calls(), vec![Call::Ack(1), Call::Ack(2), Call::Ack(3)]);
}

#[test]
fn competing_consumers_on_a_shared_queue_ack_every_delivery_once() {
    let channel = Arc::new(RecordingChannel::default());
    let dispatcher = Arc::new(AutoAckConsumer::new(channel.clone()));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let reader = Arc::new(AutoAckConsumer::with_queue(channel.clone(), Arc::clone(dispatcher.queue())));
            thread::spawn(move || reader.deliveries().map(|delivery| delivery.unwrap()).count())
        })
        .collect();

    for tag in 1..=1_000 {
        dispatcher.handle_deliver(delivery(tag)).unwrap();
    }
    dispatcher.handle_cancel(&"ctag-it".into());

    let received: usize = readers.into_iter().map(|reader| reader.join().unwrap()).sum();
    assert_eq!(received, 1_000);
    let mut acked: Vec<u64> = channel
        .calls()
        .into_iter()
        .map(|call| match call {
            Call::Ack(tag) => tag,
            other => panic!("unexpected call {:?}", other),
        })
        .collect();
    acked.sort_unstable();
    assert_eq!(acked, (1..=1_000).collect::<Vec<_>>());
}

#[test]
fn acknowledge_handler_settles_from_handler_result() {
    let channel = Arc::new(RecordingChannel::default());
    let consumer = ManualAckConsumer::new(channel.clone());
    let handler = MessageAcknowledgeHandler::new(channel.clone());
    consumer.handle_deliver(delivery(1)).unwrap();
    consumer.handle_deliver(delivery(2)).unwrap();

    let ok = handler
        .invoke(&consumer.dequeue().unwrap(), |envelope| Ok::<_, String>(envelope.body().len()))
        .unwrap();
    assert_eq!(ok, Ok(8));
    let failed = handler
        .invoke(&consumer.dequeue().unwrap(), |_| Err::<usize, _>("downstream unavailable".to_string()))
        .unwrap();
    assert!(failed.is_err());

    assert_eq!(channel.calls(), vec![Call::Ack(1), Call::Reject(2, true)]);
}

#[test]
fn rollback_on_a_closed_channel_reports_the_reject_failure() {
    let consumer = TransactionalConsumer::new(Arc::new(RecordingChannel::closed()));
    consumer.handle_deliver(delivery(12)).unwrap();
    let txn = Transaction::new();
    consumer.dequeue(&txn).unwrap();

    let err = txn.rollback().unwrap_err();
    assert_eq!(err.delivery_tag(), Some(12));
    assert!(matches!(
        err,
        RabbitMQError::Channel(ChannelError::RejectFailed { requeue: true, .. })
    ));
}

#[test]
fn cancel_on_a_closed_channel_still_closes_the_queue() {
    let consumer = ManualAckConsumer::new(Arc::new(RecordingChannel::closed()));
    consumer.handle_consume_ok("ctag-it".into()).unwrap();
    consumer.handle_deliver(delivery(1)).unwrap();

    let err = consumer.cancel().unwrap_err();
    assert!(matches!(
        err,
        RabbitMQError::Channel(ChannelError::Closed { reply_code: 320, .. })
    ));
    assert_eq!(consumer.dequeue().unwrap().delivery_tag(), 1);
    assert!(consumer.dequeue().unwrap_err().is_queue_closed());
}
