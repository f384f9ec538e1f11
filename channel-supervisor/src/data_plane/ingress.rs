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

//! HTTP ingress: host-header routing and backend publishing.

use crate::backend::connection::ConnectionManager;
use crate::channel::ChannelReference;
use crate::error::SupervisorError;
use crate::message::{EventMessage, ATTRIBUTE_PREFIX};
use crate::observability::events;
use crate::reporter::StatsReporter;
use crate::routing::host_router::HostChannelRouter;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

const COMPONENT: &str = "inbound_publisher";

/// Receive path: resolves the request host to a channel and publishes the
/// event to the channel's backend subject.
pub(crate) struct InboundPublisher {
    connection: Arc<ConnectionManager>,
    host_router: Arc<HostChannelRouter>,
    reporter: Arc<dyn StatsReporter>,
}

impl InboundPublisher {
    pub(crate) fn new(
        connection: Arc<ConnectionManager>,
        host_router: Arc<HostChannelRouter>,
        reporter: Arc<dyn StatsReporter>,
    ) -> Self {
        Self {
            connection,
            host_router,
            reporter,
        }
    }

    pub(crate) async fn receive(
        &self,
        hostname: &str,
        event: &EventMessage,
    ) -> Result<ChannelReference, SupervisorError> {
        let channel = self.host_router.resolve(hostname).inspect_err(|err| {
            error!(
                event = events::INGRESS_HOST_NOT_FOUND,
                component = COMPONENT,
                hostname,
                err = %err,
                "could not resolve request host"
            );
        })?;

        info!(
            event = events::INGRESS_RECEIVE,
            component = COMPONENT,
            channel = %channel,
            "received event"
        );

        self.publish(&channel, event).await?;
        Ok(channel)
    }

    /// Publishes one event to the channel subject.
    ///
    /// The connection is snapshotted per request so no handle outlives a
    /// reconnect. A connection-lost error signals a reconnect and surfaces;
    /// the HTTP layer answers with a retryable status.
    async fn publish(
        &self,
        channel: &ChannelReference,
        event: &EventMessage,
    ) -> Result<(), SupervisorError> {
        let Some(connection) = self.connection.current_connection() else {
            error!(component = COMPONENT, "no connection to the streaming backend");
            return Err(SupervisorError::ConnectionUnavailable);
        };

        let subject = channel.subject();
        let payload = event.to_wire()?;
        match connection.publish(&subject, payload).await {
            Ok(()) => {
                debug!(
                    event = events::PUBLISH_OK,
                    component = COMPONENT,
                    channel = %channel,
                    subject = subject.as_str(),
                    "published"
                );
                Ok(())
            }
            Err(source) if source.is_connection_closed() => {
                error!(
                    event = events::PUBLISH_FAILED,
                    component = COMPONENT,
                    subject = subject.as_str(),
                    err = %source,
                    "connection lost during send; reconnecting"
                );
                self.connection.signal_reconnect();
                Err(SupervisorError::ConnectionLost)
            }
            Err(source) => {
                error!(
                    event = events::PUBLISH_FAILED,
                    component = COMPONENT,
                    subject = subject.as_str(),
                    err = %source,
                    "error during send"
                );
                Err(SupervisorError::PublishFailed { subject, source })
            }
        }
    }
}

/// The ingress HTTP application serving event POSTs on `/`.
pub(crate) fn ingress_router(publisher: Arc<InboundPublisher>) -> Router {
    Router::new()
        .route("/", post(receive_event))
        .with_state(publisher)
}

async fn receive_event(
    State(publisher): State<Arc<InboundPublisher>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let Some(hostname) = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
    else {
        publisher.reporter.event_received(None, 400);
        return (StatusCode::BAD_REQUEST, "missing Host header".to_string());
    };

    let event = event_from_http(&headers, &body);
    match publisher.receive(hostname, &event).await {
        Ok(channel) => {
            publisher.reporter.event_received(Some(&channel), 202);
            (StatusCode::ACCEPTED, String::new())
        }
        Err(err) => {
            let status = status_for_error(&err);
            publisher.reporter.event_received(None, status.as_u16());
            (status, err.to_string())
        }
    }
}

/// Builds the event envelope from a binary-mode HTTP request: every `ce-*`
/// header becomes a context attribute, the content type and body ride along.
fn event_from_http(headers: &HeaderMap, body: &Bytes) -> EventMessage {
    let mut attributes = BTreeMap::new();
    for (name, value) in headers {
        if !name.as_str().starts_with(ATTRIBUTE_PREFIX) {
            continue;
        }
        let Ok(value) = value.to_str() else {
            continue;
        };
        attributes.insert(name.as_str().to_string(), value.to_string());
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    EventMessage::new(attributes, content_type, body.to_vec())
}

fn status_for_error(err: &SupervisorError) -> StatusCode {
    match err {
        SupervisorError::HostNotFound { .. } => StatusCode::NOT_FOUND,
        SupervisorError::ConnectionUnavailable | SupervisorError::ConnectionLost => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
