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

//! Streaming-backend seam: dial, publish, durable subscribe, manual ack.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub(crate) mod connection;

/// Errors surfaced by a streaming backend implementation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend reported the connection closed mid-operation. Every
    /// observer of this variant must signal a reconnect and surface the error.
    #[error("connection to the streaming backend has been closed")]
    ConnectionClosed,
    #[error("{0}")]
    Protocol(String),
}

impl BackendError {
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, BackendError::ConnectionClosed)
    }
}

/// Parameters for one durable subscription.
///
/// Subscriptions are always created in manual-ack mode: the backend retains
/// each delivered message until the listener acks it, and redelivers after
/// `ack_wait` otherwise.
#[derive(Clone, Debug)]
pub struct SubscribeOptions {
    /// Backend-side identifier preserving the subscriber's read position
    /// across process restarts.
    pub durable_name: String,
    pub ack_wait: Duration,
    /// Per-subscription cap on unacked in-flight deliveries.
    pub max_inflight: usize,
}

/// Dials the streaming backend.
#[async_trait]
pub trait StreamingBackend: Send + Sync {
    async fn connect(
        &self,
        cluster_id: &str,
        client_id: &str,
        natss_url: &str,
    ) -> Result<Arc<dyn BackendConnection>, BackendError>;
}

/// One live connection to the streaming backend.
#[async_trait]
pub trait BackendConnection: Send + Sync {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BackendError>;

    async fn subscribe(
        &self,
        subject: &str,
        options: SubscribeOptions,
        listener: Arc<dyn BackendListener>,
    ) -> Result<Arc<dyn BackendSubscription>, BackendError>;
}

/// Handle to one live backend subscription.
///
/// `unsubscribe` also removes the backend's durable state for the
/// subscription's durable name.
#[async_trait]
pub trait BackendSubscription: Send + Sync {
    async fn unsubscribe(&self) -> Result<(), BackendError>;
}

/// One message delivered by the backend, retained until acked.
#[async_trait]
pub trait BackendMessage: Send + Sync {
    fn subject(&self) -> &str;
    fn sequence(&self) -> u64;
    fn payload(&self) -> &[u8];

    async fn ack(&self) -> Result<(), BackendError>;
}

/// Delivery callback attached to one subscription.
#[async_trait]
pub trait BackendListener: Send + Sync {
    async fn on_message(&self, message: Box<dyn BackendMessage>);
}
