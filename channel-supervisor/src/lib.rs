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

//! # channel-supervisor
//!
//! `channel-supervisor` fronts a durable publish/subscribe streaming backend
//! and bridges it to an HTTP eventing topology. For each logical channel the
//! supervisor owns, it keeps a set of durable backend subscriptions that
//! forward incoming events to HTTP subscribers (with optional reply and
//! dead-letter routing), accepts inbound events addressed to a channel by
//! virtual host, and re-establishes the single shared backend connection
//! whenever it is lost.
//!
//! Typical usage is API-first and centered on [`SubscriptionSupervisor`]:
//! construct it over a [`backend::StreamingBackend`] and a
//! [`MessageDispatcher`], run [`SubscriptionSupervisor::start`], and let the
//! control plane drive [`SubscriptionSupervisor::process_channels`] and
//! [`SubscriptionSupervisor::update_subscriptions`].
//!
//! ## Internal architecture map
//!
//! - Backend seam: connection lifecycle and the dial/publish/subscribe traits
//! - Control plane: the per-channel subscription registry
//! - Routing: host-header resolution to channel identity
//! - Data plane: HTTP ingress publishing and backend delivery dispatch
//! - Dispatch: the outbound HTTP delivery collaborator
//!
//! ## Observability model
//!
//! The crate uses `tracing` for logs/events. Library code emits events/spans
//! and does not unconditionally initialize a global subscriber. Binaries and
//! tests are responsible for one-time `tracing_subscriber` initialization at
//! process boundaries.

pub mod backend;
mod channel;
mod control_plane;
mod data_plane;
mod dispatch;
mod error;
mod message;
mod observability;
mod reporter;
mod routing;
mod subscription;
mod supervisor;

pub use channel::{ChannelEntry, ChannelReference};
pub use dispatch::{
    DispatchDestinations, DispatchError, DispatchOutcome, HttpDispatcher, MessageDispatcher,
};
pub use error::SupervisorError;
pub use message::EventMessage;
pub use reporter::{NopReporter, StatsReporter};
pub use subscription::{DeliverySpec, SubscriberSpec, SubscriberUid, SubscriptionReference};
pub use supervisor::{SubscribeFailures, SubscriptionSupervisor, SupervisorArgs};
