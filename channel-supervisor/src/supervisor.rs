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

//! Supervisor facade: reconcile entry points, ingress serving, subscribe and
//! unsubscribe ownership.

use crate::backend::connection::ConnectionManager;
use crate::backend::{BackendSubscription, StreamingBackend, SubscribeOptions};
use crate::channel::{ChannelEntry, ChannelReference};
use crate::control_plane::subscription_registry::{SubscriptionEntry, SubscriptionRegistry};
use crate::data_plane::egress::SubscriptionDeliveryListener;
use crate::data_plane::ingress::{ingress_router, InboundPublisher};
use crate::dispatch::MessageDispatcher;
use crate::error::SupervisorError;
use crate::observability::events;
use crate::reporter::{NopReporter, StatsReporter};
use crate::routing::host_router::HostChannelRouter;
use crate::subscription::{SubscriberSpec, SubscriberUid, SubscriptionReference};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const COMPONENT: &str = "supervisor";

const SECONDS_PER_MINUTE: u64 = 60;

/// Per-subscriber subscribe failures of one reconcile pass, keyed by uid.
/// These are partial failures: the reconcile call itself still succeeds.
pub type SubscribeFailures = HashMap<SubscriberUid, SupervisorError>;

/// Construction options for [`SubscriptionSupervisor`].
pub struct SupervisorArgs {
    /// Broker address handed to the backend on every dial.
    pub natss_url: String,
    /// Backend cluster identifier.
    pub cluster_id: String,
    /// This supervisor's identity on the backend.
    pub client_id: String,
    /// Ack wait applied to every subscription, in minutes.
    pub ack_wait_minutes: u64,
    /// Per-subscription cap on unacked in-flight deliveries.
    pub max_inflight: usize,
    pub backend: Arc<dyn StreamingBackend>,
    pub dispatcher: Arc<dyn MessageDispatcher>,
    /// Metrics sink for ingress outcomes; `None` discards reports.
    pub reporter: Option<Arc<dyn StatsReporter>>,
}

/// Supervises the subscriptions of every channel this process owns.
///
/// For each channel the supervisor keeps a set of durable backend
/// subscriptions forwarding events to HTTP subscribers, accepts inbound
/// events addressed to a channel by virtual host, and re-establishes the
/// single shared backend connection whenever it is lost.
///
/// # Examples
///
/// ```
/// use channel_supervisor::{
///     ChannelEntry, ChannelReference, HttpDispatcher, SubscriptionSupervisor, SupervisorArgs,
/// };
/// use std::sync::Arc;
/// # use async_trait::async_trait;
/// # use channel_supervisor::backend::{BackendConnection, BackendError, StreamingBackend};
/// #
/// # struct UnreachableBackend;
/// #
/// # #[async_trait]
/// # impl StreamingBackend for UnreachableBackend {
/// #     async fn connect(
/// #         &self,
/// #         _cluster_id: &str,
/// #         _client_id: &str,
/// #         _natss_url: &str,
/// #     ) -> Result<Arc<dyn BackendConnection>, BackendError> {
/// #         Err(BackendError::Protocol("no broker in doctests".to_string()))
/// #     }
/// # }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let supervisor = SubscriptionSupervisor::new(SupervisorArgs {
///     natss_url: "nats://localhost:4222".to_string(),
///     cluster_id: "knative-nats-streaming".to_string(),
///     client_id: "channel-supervisor".to_string(),
///     ack_wait_minutes: 1,
///     max_inflight: 32,
///     backend: Arc::new(UnreachableBackend),
///     dispatcher: Arc::new(HttpDispatcher::new()),
///     reporter: None,
/// });
///
/// supervisor
///     .process_channels(&[ChannelEntry::new(
///         ChannelReference::new("default", "orders"),
///         "orders.default.example.com",
///     )])
///     .unwrap();
///
/// // Tearing down a channel that was never subscribed is a no-op.
/// let failures = supervisor
///     .update_subscriptions("orders", "default", &[], true)
///     .await
///     .unwrap();
/// assert!(failures.is_empty());
/// # });
/// ```
pub struct SubscriptionSupervisor {
    connection: Arc<ConnectionManager>,
    host_router: Arc<HostChannelRouter>,
    publisher: Arc<InboundPublisher>,
    dispatcher: Arc<dyn MessageDispatcher>,
    /// Guards the whole registry; held across backend subscribe/unsubscribe.
    /// Lock order: this mutex before the connection state, never the reverse.
    subscriptions: Mutex<SubscriptionRegistry>,
    ack_wait: Duration,
    max_inflight: usize,
}

impl SubscriptionSupervisor {
    pub fn new(args: SupervisorArgs) -> Self {
        let connection = Arc::new(ConnectionManager::new(
            args.backend,
            args.natss_url,
            args.cluster_id,
            args.client_id,
        ));
        let host_router = Arc::new(HostChannelRouter::new());
        let reporter = args
            .reporter
            .unwrap_or_else(|| Arc::new(NopReporter) as Arc<dyn StatsReporter>);
        let publisher = Arc::new(InboundPublisher::new(
            connection.clone(),
            host_router.clone(),
            reporter,
        ));

        Self {
            connection,
            host_router,
            publisher,
            dispatcher: args.dispatcher,
            subscriptions: Mutex::new(SubscriptionRegistry::default()),
            ack_wait: Duration::from_secs(args.ack_wait_minutes * SECONDS_PER_MINUTE),
            max_inflight: args.max_inflight,
        }
    }

    /// Spawns the connection worker, emits the initial reconnect signal, and
    /// serves ingress on `listener` until `shutdown` fires.
    pub async fn start(
        &self,
        listener: tokio::net::TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), SupervisorError> {
        self.connection.start(shutdown.clone());
        self.connection.signal_reconnect();

        let app = ingress_router(self.publisher.clone());
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;
        Ok(())
    }

    /// Rebuilds the host→channel routing table from the full watched-channel
    /// list. On a duplicate hostname the previous table stays installed.
    pub fn process_channels(&self, channels: &[ChannelEntry]) -> Result<(), SupervisorError> {
        debug!(
            component = COMPONENT,
            channels = channels.len(),
            "process channels"
        );
        self.host_router.rebuild(channels)
    }

    /// Converges the channel's backend subscriptions to `subscribers`.
    ///
    /// An empty desired set or `is_finalizer` tears the channel down. Existing
    /// still-desired subscriptions are never recreated, so their durable
    /// position is preserved. Per-subscriber subscribe failures come back in
    /// the map; unsubscribe failures are logged and dropped because the
    /// control plane retries reconciliation anyway.
    pub async fn update_subscriptions(
        &self,
        name: &str,
        namespace: &str,
        subscribers: &[SubscriberSpec],
        is_finalizer: bool,
    ) -> Result<SubscribeFailures, SupervisorError> {
        let mut registry = self.subscriptions.lock().await;

        let channel = ChannelReference::new(namespace, name);
        let mut failures = SubscribeFailures::new();
        info!(
            event = events::RECONCILE_START,
            component = COMPONENT,
            channel = %channel,
            subscribers = subscribers.len(),
            is_finalizer,
            "update subscriptions"
        );

        if subscribers.is_empty() || is_finalizer {
            if !registry.has_channel(&channel) {
                info!(
                    event = events::RECONCILE_CHANNEL_ABSENT,
                    component = COMPONENT,
                    channel = %channel,
                    "no subscriptions registered; nothing to do"
                );
                return Ok(failures);
            }
            for uid in registry.subscription_uids(&channel) {
                if let Err(err) = self.unsubscribe(&mut registry, &channel, &uid).await {
                    error!(
                        event = events::UNSUBSCRIBE_FAILED,
                        component = COMPONENT,
                        channel = %channel,
                        subscription_uid = uid.as_str(),
                        err = %err,
                        "unsubscribe"
                    );
                }
            }
            registry.remove_channel(&channel);
            return Ok(failures);
        }

        registry.ensure_channel(&channel);
        let mut active: HashSet<SubscriberUid> = HashSet::with_capacity(subscribers.len());

        for spec in subscribers {
            let subscription = SubscriptionReference::from(spec);
            if registry.contains(&channel, &subscription.uid) {
                debug!(
                    event = events::SUBSCRIPTION_ALREADY_ACTIVE,
                    component = COMPONENT,
                    channel = %channel,
                    subscription_uid = subscription.uid.as_str(),
                    "subscription already active"
                );
                active.insert(subscription.uid);
                continue;
            }

            match self.subscribe(&channel, &subscription).await {
                Ok(handle) => {
                    active.insert(subscription.uid.clone());
                    registry.insert(
                        &channel,
                        SubscriptionEntry {
                            reference: subscription,
                            handle,
                        },
                    );
                }
                Err(err) => {
                    error!(
                        event = events::SUBSCRIBE_FAILED,
                        component = COMPONENT,
                        channel = %channel,
                        subscription_uid = spec.uid.as_str(),
                        err = %err,
                        "failed to subscribe"
                    );
                    failures.insert(spec.uid.clone(), err);
                }
            }
        }

        // Unsubscribe for deleted subscriptions.
        for uid in registry.subscription_uids(&channel) {
            if active.contains(&uid) {
                continue;
            }
            if let Err(err) = self.unsubscribe(&mut registry, &channel, &uid).await {
                error!(
                    event = events::UNSUBSCRIBE_FAILED,
                    component = COMPONENT,
                    channel = %channel,
                    subscription_uid = uid.as_str(),
                    err = %err,
                    "unsubscribe"
                );
            }
        }

        registry.prune_channel_if_empty(&channel);
        Ok(failures)
    }

    /// Creates one durable backend subscription delivering to the
    /// subscription's endpoints.
    async fn subscribe(
        &self,
        channel: &ChannelReference,
        subscription: &SubscriptionReference,
    ) -> Result<Arc<dyn BackendSubscription>, SupervisorError> {
        info!(
            component = COMPONENT,
            channel = %channel,
            subscription_uid = subscription.uid.as_str(),
            "subscribe to channel"
        );

        let Some(connection) = self.connection.current_connection() else {
            return Err(SupervisorError::ConnectionUnavailable);
        };

        let listener = Arc::new(SubscriptionDeliveryListener::new(
            channel.clone(),
            subscription.clone(),
            self.dispatcher.clone(),
        ));
        let options = SubscribeOptions {
            durable_name: subscription.durable_name().to_string(),
            ack_wait: self.ack_wait,
            max_inflight: self.max_inflight,
        };

        match connection
            .subscribe(&channel.subject(), options, listener)
            .await
        {
            Ok(handle) => {
                info!(
                    event = events::SUBSCRIBE_OK,
                    component = COMPONENT,
                    channel = %channel,
                    durable_name = subscription.durable_name(),
                    "subscription created"
                );
                Ok(handle)
            }
            Err(source) if source.is_connection_closed() => {
                error!(
                    component = COMPONENT,
                    durable_name = subscription.durable_name(),
                    "connection lost during subscribe; reconnecting"
                );
                self.connection.signal_reconnect();
                Err(SupervisorError::ConnectionLost)
            }
            Err(source) => Err(SupervisorError::SubscribeFailed {
                durable_name: subscription.durable_name().to_string(),
                source,
            }),
        }
    }

    /// Releases one subscription. Must be called while holding the registry
    /// mutex; the entry is dropped regardless of the backend outcome because
    /// leaking the slot is worse than dropping state the backend may already
    /// have released.
    async fn unsubscribe(
        &self,
        registry: &mut SubscriptionRegistry,
        channel: &ChannelReference,
        uid: &SubscriberUid,
    ) -> Result<(), SupervisorError> {
        info!(
            event = events::UNSUBSCRIBE_START,
            component = COMPONENT,
            channel = %channel,
            subscription_uid = uid.as_str(),
            "unsubscribe from channel"
        );

        if let Some(entry) = registry.remove_subscription(channel, uid) {
            entry
                .handle
                .unsubscribe()
                .await
                .map_err(|source| SupervisorError::UnsubscribeFailed {
                    durable_name: entry.reference.durable_name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }
}
