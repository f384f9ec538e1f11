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

//! Default HTTP dispatcher: destination POST, reply routing, dead-letter fallback.

use crate::dispatch::{DispatchDestinations, DispatchError, DispatchOutcome, MessageDispatcher};
use crate::message::{EventMessage, ATTRIBUTE_PREFIX};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use url::Url;

const COMPONENT: &str = "http_dispatcher";

/// Delivers events over binary-mode HTTP POST.
///
/// The destination is tried first; a successful response that itself carries
/// an event is re-dispatched to the reply URI when one is set. Failures fall
/// back to the dead-letter URI when one is set, otherwise they surface and
/// the backend redelivers.
pub struct HttpDispatcher {
    client: reqwest::Client,
}

impl HttpDispatcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn post_event(
        &self,
        url: &Url,
        message: &EventMessage,
    ) -> Result<reqwest::Response, DispatchError> {
        self.client
            .post(url.clone())
            .headers(Self::headers_for(message))
            .body(message.payload.clone())
            .send()
            .await
            .map_err(|err| DispatchError::RequestFailed {
                url: url.clone(),
                reason: err.to_string(),
            })
    }

    fn headers_for(message: &EventMessage) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &message.attributes {
            let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
                continue;
            };
            let Ok(header_value) = HeaderValue::from_str(value) else {
                continue;
            };
            headers.insert(header_name, header_value);
        }
        if let Some(content_type) = &message.content_type {
            if let Ok(header_value) = HeaderValue::from_str(content_type) {
                headers.insert(CONTENT_TYPE, header_value);
            }
        }
        headers
    }

    /// Extracts an event from a subscriber response, if it carries one.
    async fn event_from_response(response: reqwest::Response) -> Option<EventMessage> {
        let mut attributes = BTreeMap::new();
        for (name, value) in response.headers() {
            if !name.as_str().starts_with(ATTRIBUTE_PREFIX) {
                continue;
            }
            let Ok(value) = value.to_str() else {
                continue;
            };
            attributes.insert(name.as_str().to_string(), value.to_string());
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let payload = response.bytes().await.ok()?.to_vec();

        if attributes.is_empty() && payload.is_empty() {
            return None;
        }
        Some(EventMessage::new(attributes, content_type, payload))
    }

    async fn forward_to_dead_letter(
        &self,
        destinations: &DispatchDestinations,
        message: &EventMessage,
        cause: DispatchError,
    ) -> Result<DispatchOutcome, DispatchError> {
        let Some(dead_letter) = destinations.dead_letter.as_ref() else {
            return Err(cause);
        };

        match self.post_event(dead_letter, message).await {
            Ok(response) if response.status().is_success() => {
                debug!(
                    component = COMPONENT,
                    dead_letter = %dead_letter,
                    cause = %cause,
                    "event forwarded to dead letter sink"
                );
                Ok(DispatchOutcome {
                    response_code: Some(response.status().as_u16()),
                    dead_lettered: true,
                })
            }
            Ok(response) => {
                warn!(
                    component = COMPONENT,
                    dead_letter = %dead_letter,
                    status = response.status().as_u16(),
                    "dead letter sink rejected the event"
                );
                Err(cause)
            }
            Err(err) => {
                warn!(
                    component = COMPONENT,
                    dead_letter = %dead_letter,
                    err = %err,
                    "dead letter forward failed"
                );
                Err(cause)
            }
        }
    }
}

impl Default for HttpDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageDispatcher for HttpDispatcher {
    async fn dispatch(
        &self,
        message: &EventMessage,
        destinations: &DispatchDestinations,
    ) -> Result<DispatchOutcome, DispatchError> {
        // With no destination the event goes straight to the reply URI.
        let (primary, reply) = match (&destinations.destination, &destinations.reply) {
            (Some(destination), reply) => (destination, reply.as_ref()),
            (None, Some(reply)) => (reply, None),
            (None, None) => return Err(DispatchError::NoDestination),
        };

        let response = match self.post_event(primary, message).await {
            Ok(response) => response,
            Err(err) => return self.forward_to_dead_letter(destinations, message, err).await,
        };

        let status = response.status();
        if !status.is_success() {
            let err = DispatchError::UnexpectedStatus {
                url: primary.clone(),
                status: status.as_u16(),
            };
            return self.forward_to_dead_letter(destinations, message, err).await;
        }

        if let Some(reply) = reply {
            if let Some(reply_event) = Self::event_from_response(response).await {
                match self.post_event(reply, &reply_event).await {
                    Ok(reply_response) if reply_response.status().is_success() => {}
                    Ok(reply_response) => {
                        let err = DispatchError::UnexpectedStatus {
                            url: reply.clone(),
                            status: reply_response.status().as_u16(),
                        };
                        return self
                            .forward_to_dead_letter(destinations, &reply_event, err)
                            .await;
                    }
                    Err(err) => {
                        return self
                            .forward_to_dead_letter(destinations, &reply_event, err)
                            .await;
                    }
                }
            }
        }

        Ok(DispatchOutcome {
            response_code: Some(status.as_u16()),
            dead_lettered: false,
        })
    }
}
