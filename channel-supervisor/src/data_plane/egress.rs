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

//! Backend delivery callback: dispatch with failure isolation and manual ack.

use crate::backend::{BackendListener, BackendMessage};
use crate::channel::ChannelReference;
use crate::dispatch::{DispatchDestinations, MessageDispatcher};
use crate::message::EventMessage;
use crate::observability::{events, fields};
use crate::subscription::SubscriptionReference;
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};

const COMPONENT: &str = "delivery_listener";

/// Per-subscription delivery callback.
///
/// Delivery is at-least-once: the message is acked strictly after a
/// successful dispatch. Dispatch errors, decode failures, and panics leave
/// the message unacked so the backend redelivers after the ack wait.
pub(crate) struct SubscriptionDeliveryListener {
    channel: ChannelReference,
    subscription: SubscriptionReference,
    dispatcher: Arc<dyn MessageDispatcher>,
}

impl SubscriptionDeliveryListener {
    pub(crate) fn new(
        channel: ChannelReference,
        subscription: SubscriptionReference,
        dispatcher: Arc<dyn MessageDispatcher>,
    ) -> Self {
        Self {
            channel,
            subscription,
            dispatcher,
        }
    }

    async fn handle_message(&self, message: &dyn BackendMessage) -> bool {
        debug!(
            event = events::DELIVERY_RECEIVED,
            component = COMPONENT,
            subject = message.subject(),
            sequence = message.sequence(),
            subscription_uid = self.subscription.uid.as_str(),
            "backend message received"
        );

        let event = match EventMessage::from_wire(message.payload()) {
            Ok(event) => event,
            Err(err) => {
                error!(
                    event = events::DELIVERY_DECODE_FAILED,
                    component = COMPONENT,
                    subject = message.subject(),
                    sequence = message.sequence(),
                    subscription_uid = self.subscription.uid.as_str(),
                    err = %err,
                    "could not build an event from the backend payload"
                );
                return false;
            }
        };

        let destinations = DispatchDestinations::from(&self.subscription);
        debug!(
            component = COMPONENT,
            destination = %fields::format_optional_url(destinations.destination.as_ref()),
            reply = %fields::format_optional_url(destinations.reply.as_ref()),
            dead_letter = %fields::format_optional_url(destinations.dead_letter.as_ref()),
            "dispatching message"
        );

        match self.dispatcher.dispatch(&event, &destinations).await {
            Ok(outcome) => {
                debug!(
                    event = events::DISPATCH_OK,
                    component = COMPONENT,
                    subscription_uid = self.subscription.uid.as_str(),
                    event_id = %fields::format_event_id(&event),
                    outcome = ?outcome,
                    "message dispatched"
                );
                true
            }
            Err(err) => {
                error!(
                    event = events::DISPATCH_FAILED,
                    component = COMPONENT,
                    subscription_uid = self.subscription.uid.as_str(),
                    event_id = %fields::format_event_id(&event),
                    err = %err,
                    "failed to dispatch message"
                );
                false
            }
        }
    }
}

#[async_trait]
impl BackendListener for SubscriptionDeliveryListener {
    async fn on_message(&self, message: Box<dyn BackendMessage>) {
        // The handler runs inside a panic boundary: a panicking dispatch must
        // not ack, and must not take the delivery pump down with it.
        let handled = AssertUnwindSafe(self.handle_message(message.as_ref()))
            .catch_unwind()
            .await;

        match handled {
            Ok(true) => {
                if let Err(err) = message.ack().await {
                    error!(
                        event = events::ACK_FAILED,
                        component = COMPONENT,
                        subject = message.subject(),
                        sequence = message.sequence(),
                        subscription_uid = self.subscription.uid.as_str(),
                        err = %err,
                        "failed to acknowledge message"
                    );
                } else {
                    debug!(
                        event = events::MESSAGE_DISPATCHED,
                        component = COMPONENT,
                        channel = %self.channel,
                        sequence = message.sequence(),
                        "message dispatched and acked"
                    );
                }
            }
            Ok(false) => {
                // No ack: backend redelivery is the recovery.
            }
            Err(panic_payload) => {
                warn!(
                    event = events::DELIVERY_PANIC,
                    component = COMPONENT,
                    subject = message.subject(),
                    sequence = message.sequence(),
                    subscription_uid = self.subscription.uid.as_str(),
                    panic = %format_panic(panic_payload.as_ref()),
                    "panic happened while handling a message"
                );
            }
        }
    }
}

fn format_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
