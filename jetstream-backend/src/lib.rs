/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! # jetstream-backend
//!
//! NATS JetStream implementation of the `channel-supervisor` backend seam.
//!
//! One stream named after the supervisor's cluster id captures the two-token
//! channel subjects (`name.namespace`). Each subscription becomes a durable
//! pull consumer with an explicit ack policy, so read positions survive
//! process restarts and unacked messages are redelivered after the ack wait.

use async_nats::connection::State;
use async_nats::jetstream;
use async_nats::jetstream::consumer::{pull, AckPolicy};
use async_trait::async_trait;
use channel_supervisor::backend::{
    BackendConnection, BackendError, BackendListener, BackendMessage, BackendSubscription,
    StreamingBackend, SubscribeOptions,
};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "jetstream_backend";

/// Subject filter capturing every `name.namespace` channel subject.
const CHANNEL_SUBJECT_PATTERN: &str = "*.*";

/// Dials a JetStream-enabled NATS server.
#[derive(Default)]
pub struct JetStreamBackend;

impl JetStreamBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StreamingBackend for JetStreamBackend {
    async fn connect(
        &self,
        cluster_id: &str,
        client_id: &str,
        natss_url: &str,
    ) -> Result<Arc<dyn BackendConnection>, BackendError> {
        let client = async_nats::ConnectOptions::new()
            .name(client_id)
            .connect(natss_url)
            .await
            .map_err(|err| BackendError::Protocol(err.to_string()))?;
        let context = jetstream::new(client.clone());

        // The stream is shared wire state: peers publishing to the same
        // channel subjects land in the same stream.
        context
            .get_or_create_stream(jetstream::stream::Config {
                name: cluster_id.to_string(),
                subjects: vec![CHANNEL_SUBJECT_PATTERN.to_string()],
                ..Default::default()
            })
            .await
            .map_err(|err| BackendError::Protocol(err.to_string()))?;

        debug!(
            component = COMPONENT,
            cluster_id, natss_url, "connected to JetStream"
        );
        Ok(Arc::new(JetStreamConnection {
            client,
            context,
            stream_name: cluster_id.to_string(),
        }))
    }
}

struct JetStreamConnection {
    client: async_nats::Client,
    context: jetstream::Context,
    stream_name: String,
}

impl JetStreamConnection {
    /// A disconnected client turns every protocol error into the
    /// connection-closed kind so the supervisor signals a reconnect.
    fn classify(&self, err: impl ToString) -> BackendError {
        if self.client.connection_state() == State::Disconnected {
            return BackendError::ConnectionClosed;
        }
        BackendError::Protocol(err.to_string())
    }
}

fn consumer_config(subject: &str, options: &SubscribeOptions) -> pull::Config {
    pull::Config {
        durable_name: Some(options.durable_name.clone()),
        filter_subject: subject.to_string(),
        ack_policy: AckPolicy::Explicit,
        ack_wait: options.ack_wait,
        max_ack_pending: options.max_inflight as i64,
        ..Default::default()
    }
}

#[async_trait]
impl BackendConnection for JetStreamConnection {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BackendError> {
        let publish_ack = self
            .context
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|err| self.classify(err))?;
        publish_ack.await.map_err(|err| self.classify(err))?;
        Ok(())
    }

    async fn subscribe(
        &self,
        subject: &str,
        options: SubscribeOptions,
        listener: Arc<dyn BackendListener>,
    ) -> Result<Arc<dyn BackendSubscription>, BackendError> {
        let stream = self
            .context
            .get_stream(&self.stream_name)
            .await
            .map_err(|err| self.classify(err))?;
        let consumer = stream
            .get_or_create_consumer(&options.durable_name, consumer_config(subject, &options))
            .await
            .map_err(|err| self.classify(err))?;
        let mut messages = consumer
            .messages()
            .await
            .map_err(|err| self.classify(err))?;

        let durable_name = options.durable_name.clone();
        let pump_durable = durable_name.clone();
        let pump = tokio::spawn(async move {
            while let Some(next) = messages.next().await {
                match next {
                    Ok(message) => {
                        listener
                            .on_message(Box::new(JetStreamMessage { inner: message }))
                            .await;
                    }
                    Err(err) => {
                        warn!(
                            component = COMPONENT,
                            durable_name = pump_durable.as_str(),
                            err = %err,
                            "message stream error"
                        );
                    }
                }
            }
            debug!(
                component = COMPONENT,
                durable_name = pump_durable.as_str(),
                "message stream ended"
            );
        });

        Ok(Arc::new(JetStreamSubscription {
            context: self.context.clone(),
            stream_name: self.stream_name.clone(),
            durable_name,
            pump,
        }))
    }
}

struct JetStreamSubscription {
    context: jetstream::Context,
    stream_name: String,
    durable_name: String,
    pump: tokio::task::JoinHandle<()>,
}

#[async_trait]
impl BackendSubscription for JetStreamSubscription {
    async fn unsubscribe(&self) -> Result<(), BackendError> {
        self.pump.abort();
        let stream = self
            .context
            .get_stream(&self.stream_name)
            .await
            .map_err(|err| BackendError::Protocol(err.to_string()))?;
        // Deleting the consumer also drops its durable read position.
        stream
            .delete_consumer(&self.durable_name)
            .await
            .map_err(|err| BackendError::Protocol(err.to_string()))?;
        Ok(())
    }
}

struct JetStreamMessage {
    inner: jetstream::Message,
}

#[async_trait]
impl BackendMessage for JetStreamMessage {
    fn subject(&self) -> &str {
        self.inner.subject.as_str()
    }

    fn sequence(&self) -> u64 {
        self.inner
            .info()
            .map(|info| info.stream_sequence)
            .unwrap_or(0)
    }

    fn payload(&self) -> &[u8] {
        &self.inner.payload
    }

    async fn ack(&self) -> Result<(), BackendError> {
        self.inner
            .ack()
            .await
            .map_err(|err| BackendError::Protocol(err.to_string()))
    }
}
