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

use cheetah_string::CheetahString;
use rabbitmq_client_rust::BasicConsumer;
use rabbitmq_client_rust::BasicProperties;
use rabbitmq_client_rust::Channel;
use rabbitmq_client_rust::DeliveryEnvelope;
use rabbitmq_client_rust::Transaction;
use rabbitmq_client_rust::TransactionalConsumer;
use rabbitmq_error::RabbitMQResult;

pub const CONSUMER_TAG: &str = "amq.ctag-orders";
pub const QUEUE: &str = "OrderQueue";

struct LoggingChannel;

impl Channel for LoggingChannel {
    fn acknowledge(&self, delivery_tag: u64) -> RabbitMQResult<()> {
        println!("basic.ack delivery_tag={}", delivery_tag);
        Ok(())
    }

    fn reject(&self, delivery_tag: u64, requeue: bool) -> RabbitMQResult<()> {
        println!("basic.reject delivery_tag={} requeue={}", delivery_tag, requeue);
        Ok(())
    }

    fn cancel(&self, consumer_tag: &CheetahString) -> RabbitMQResult<()> {
        println!("basic.cancel consumer_tag={}", consumer_tag);
        Ok(())
    }
}

fn order(delivery_tag: u64, amount: i64) -> DeliveryEnvelope {
    DeliveryEnvelope::new(
        CONSUMER_TAG,
        delivery_tag,
        false,
        "orders",
        QUEUE,
        BasicProperties::default().with_header("amount", amount.to_string()),
        format!("order-{}", delivery_tag).into_bytes(),
    )
}

pub fn main() -> RabbitMQResult<()> {
    //init logger
    rabbitmq_rust::log::init_logger()?;

    let consumer = TransactionalConsumer::new(Arc::new(LoggingChannel));
    consumer.handle_consume_ok(CONSUMER_TAG.into())?;
    for (delivery_tag, amount) in [(1, 120), (2, -5), (3, 40)] {
        consumer.handle_deliver(order(delivery_tag, amount))?;
    }

    // one transaction per order: commit acknowledges, rollback requeues
    loop {
        let txn = Transaction::new();
        let Some(envelope) = consumer.dequeue_no_wait(&txn)? else {
            break;
        };
        let valid = envelope
            .properties()
            .header("amount")
            .and_then(|amount| amount.as_str().parse::<i64>().ok())
            .is_some_and(|amount| amount > 0);
        if valid {
            println!("storing {}", envelope);
            txn.commit()?;
        } else {
            println!("rejecting {}", envelope);
            txn.rollback()?;
        }
    }

    consumer.cancel()?;
    Ok(())
}
