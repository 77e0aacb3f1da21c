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

use cheetah_string::CheetahString;
use rabbitmq_client_rust::AckMode;
use rabbitmq_client_rust::BasicConsumer;
use rabbitmq_client_rust::BasicProperties;
use rabbitmq_client_rust::Channel;
use rabbitmq_client_rust::ConsumerConfig;
use rabbitmq_client_rust::DeliveryEnvelope;
use rabbitmq_client_rust::MessageAcknowledgeHandler;
use rabbitmq_client_rust::Received;
use rabbitmq_client_rust::Subscriber;
use rabbitmq_error::RabbitMQResult;

pub const MESSAGE_COUNT: u64 = 10;
pub const CONSUMER_TAG: &str = "amq.ctag-example";
pub const QUEUE: &str = "TaskQueue";

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

pub fn main() -> RabbitMQResult<()> {
    //init logger
    rabbitmq_rust::log::init_logger()?;

    let config = ConsumerConfig::builder()
        .ack_mode(AckMode::Manual)
        .receive_timeout_millis(1_000)
        .build()?;
    let channel: Arc<dyn Channel> = Arc::new(LoggingChannel);
    let subscriber = Subscriber::new(Arc::clone(&channel), &config);
    let handler = MessageAcknowledgeHandler::from_config(channel, &config);

    // the protocol dispatcher pushes deliveries from its own thread
    let consumer = subscriber.basic_consumer();
    let dispatcher = thread::spawn(move || -> RabbitMQResult<()> {
        consumer.handle_consume_ok(CONSUMER_TAG.into())?;
        for delivery_tag in 1..=MESSAGE_COUNT {
            consumer.handle_deliver(DeliveryEnvelope::new(
                CONSUMER_TAG,
                delivery_tag,
                false,
                "",
                QUEUE,
                BasicProperties::default().with_content_type("text/plain"),
                format!("task #{}", delivery_tag).into_bytes(),
            ))?;
            thread::sleep(Duration::from_millis(50));
        }
        consumer.handle_cancel_ok(&CONSUMER_TAG.into());
        Ok(())
    });

    loop {
        match subscriber.receive(None)? {
            Received::Delivery(envelope) => {
                let outcome = handler.invoke(&envelope, |delivery| {
                    let body = std::str::from_utf8(delivery.body())?;
                    println!("processing {}", body);
                    Ok::<_, std::str::Utf8Error>(())
                })?;
                if let Err(err) = outcome {
                    println!("delivery {} failed: {}", envelope.delivery_tag(), err);
                }
            }
            Received::TimedOut => println!("no delivery yet"),
            Received::Closed { faulted } => {
                println!("subscription closed, faulted={}", faulted);
                break;
            }
        }
    }

    dispatcher.join().expect("dispatcher thread panicked")?;
    Ok(())
}
