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

use std::collections::HashMap;

use bytes::Bytes;
use cheetah_string::CheetahString;
use serde::Deserialize;
use serde::Serialize;

/// Message metadata carried alongside a delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BasicProperties {
    pub content_type: Option<CheetahString>,
    pub content_encoding: Option<CheetahString>,
    pub headers: HashMap<CheetahString, CheetahString>,
    /// 1 = transient, 2 = persistent
    pub delivery_mode: Option<u8>,
    pub priority: Option<u8>,
    pub correlation_id: Option<CheetahString>,
    pub reply_to: Option<CheetahString>,
    pub expiration: Option<CheetahString>,
    pub message_id: Option<CheetahString>,
    /// Seconds since the epoch
    pub timestamp: Option<u64>,
    #[serde(rename = "type")]
    pub kind: Option<CheetahString>,
    pub user_id: Option<CheetahString>,
    pub app_id: Option<CheetahString>,
}

impl BasicProperties {
    pub fn with_content_type(mut self, content_type: impl Into<CheetahString>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<CheetahString>, value: impl Into<CheetahString>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<CheetahString>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<CheetahString>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    pub fn header(&self, key: &str) -> Option<&CheetahString> {
        self.headers.get(&CheetahString::from_slice(key))
    }
}

/// One received message, as handed from the protocol dispatcher to the
/// application.
///
/// An envelope is immutable once built: it owns its properties and body and
/// can be moved between threads freely.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryEnvelope {
    consumer_tag: CheetahString,
    delivery_tag: u64,
    redelivered: bool,
    exchange: CheetahString,
    routing_key: CheetahString,
    properties: BasicProperties,
    body: Bytes,
}

impl DeliveryEnvelope {
    pub fn new(
        consumer_tag: impl Into<CheetahString>,
        delivery_tag: u64,
        redelivered: bool,
        exchange: impl Into<CheetahString>,
        routing_key: impl Into<CheetahString>,
        properties: BasicProperties,
        body: impl Into<Bytes>,
    ) -> Self {
        DeliveryEnvelope {
            consumer_tag: consumer_tag.into(),
            delivery_tag,
            redelivered,
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            properties,
            body: body.into(),
        }
    }

    #[inline]
    pub fn consumer_tag(&self) -> &CheetahString {
        &self.consumer_tag
    }

    /// Channel-scoped identifier used to acknowledge or reject this delivery.
    #[inline]
    pub fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    #[inline]
    pub fn redelivered(&self) -> bool {
        self.redelivered
    }

    #[inline]
    pub fn exchange(&self) -> &CheetahString {
        &self.exchange
    }

    #[inline]
    pub fn routing_key(&self) -> &CheetahString {
        &self.routing_key
    }

    #[inline]
    pub fn properties(&self) -> &BasicProperties {
        &self.properties
    }

    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }
}

impl std::fmt::Display for DeliveryEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DeliveryEnvelope [consumerTag={}, deliveryTag={}, redelivered={}, exchange={}, routingKey={}, \
             bodyLength={}]",
            self.consumer_tag,
            self.delivery_tag,
            self.redelivered,
            self.exchange,
            self.routing_key,
            self.body.len()
        )
    }
}
