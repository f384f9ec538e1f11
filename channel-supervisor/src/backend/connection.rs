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

//! Shared-connection lifecycle: coalesced reconnect signaling and retry.

use crate::backend::{BackendConnection, StreamingBackend};
use crate::observability::events;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "connection_manager";

/// Maximum number of outstanding reconnect requests. A full channel already
/// implies "reconnect as soon as possible", so further signals are dropped.
const RECONNECT_SIGNAL_CAPACITY: usize = 10;

/// Delay between attempts to dial the streaming backend.
const RETRY_INTERVAL: Duration = Duration::from_secs(1);

struct ConnectionState {
    connection: Option<Arc<dyn BackendConnection>>,
    /// Guards the single retry task; at most one dial loop runs at a time.
    connect_in_progress: bool,
}

/// Owns the single shared backend connection and its re-establishment.
///
/// The state mutex is held only for pointer copies and flag flips, never
/// across a dial. Readers snapshot the handle and release before use.
pub(crate) struct ConnectionManager {
    backend: Arc<dyn StreamingBackend>,
    natss_url: String,
    cluster_id: String,
    client_id: String,
    state: Mutex<ConnectionState>,
    reconnect_tx: mpsc::Sender<()>,
    reconnect_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl ConnectionManager {
    pub(crate) fn new(
        backend: Arc<dyn StreamingBackend>,
        natss_url: impl Into<String>,
        cluster_id: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        let (reconnect_tx, reconnect_rx) = mpsc::channel(RECONNECT_SIGNAL_CAPACITY);
        Self {
            backend,
            natss_url: natss_url.into(),
            cluster_id: cluster_id.into(),
            client_id: client_id.into(),
            state: Mutex::new(ConnectionState {
                connection: None,
                connect_in_progress: false,
            }),
            reconnect_tx,
            reconnect_rx: Mutex::new(None),
        }
    }

    /// Requests a reconnect without blocking. A full signal channel means a
    /// reconnect is already pending and the signal is coalesced away.
    pub(crate) fn signal_reconnect(&self) {
        match self.reconnect_tx.try_send(()) {
            Ok(()) => debug!(
                event = events::RECONNECT_SIGNALED,
                component = COMPONENT,
                "reconnect requested"
            ),
            Err(_) => debug!(
                event = events::RECONNECT_SIGNAL_COALESCED,
                component = COMPONENT,
                "reconnect already pending; signal dropped"
            ),
        }
    }

    /// Snapshot of the current connection handle, if any.
    pub(crate) fn current_connection(&self) -> Option<Arc<dyn BackendConnection>> {
        self.lock_state().connection.clone()
    }

    /// Spawns the long-lived reconnect worker. Called once; a second call is
    /// a no-op because the signal receiver has already been claimed.
    pub(crate) fn start(self: &Arc<Self>, shutdown: CancellationToken) {
        let Some(mut reconnect_rx) = self.lock_receiver().take() else {
            warn!(
                component = COMPONENT,
                "connection worker already started; ignoring"
            );
            return;
        };

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    signal = reconnect_rx.recv() => {
                        if signal.is_none() {
                            break;
                        }
                        manager.handle_reconnect_signal(&shutdown);
                    }
                }
            }
            info!(
                event = events::CONNECTION_WORKER_STOPPED,
                component = COMPONENT,
                "connection worker stopped"
            );
        });
    }

    fn handle_reconnect_signal(self: &Arc<Self>, shutdown: &CancellationToken) {
        {
            let mut state = self.lock_state();
            if state.connect_in_progress {
                debug!(
                    event = events::RECONNECT_ALREADY_IN_PROGRESS,
                    component = COMPONENT,
                    "retry task already running; ignoring signal"
                );
                return;
            }
            state.connect_in_progress = true;
        }

        let manager = Arc::clone(self);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            manager.connect_with_retry(shutdown).await;
        });
    }

    /// Dials the backend once per tick until it succeeds or shutdown fires.
    /// The interval is fixed; a pending reconnect signal never piles up a
    /// second retry task because `connect_in_progress` stays set until here.
    async fn connect_with_retry(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(RETRY_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately so the initial dial is not delayed.
        ticker.tick().await;

        loop {
            match self
                .backend
                .connect(&self.cluster_id, &self.client_id, &self.natss_url)
                .await
            {
                Ok(connection) => {
                    let mut state = self.lock_state();
                    state.connection = Some(connection);
                    state.connect_in_progress = false;
                    drop(state);
                    info!(
                        event = events::CONNECT_OK,
                        component = COMPONENT,
                        natss_url = self.natss_url.as_str(),
                        cluster_id = self.cluster_id.as_str(),
                        "connected to the streaming backend"
                    );
                    return;
                }
                Err(err) => error!(
                    event = events::CONNECT_ATTEMPT_FAILED,
                    component = COMPONENT,
                    natss_url = self.natss_url.as_str(),
                    err = %err,
                    retry_in = ?RETRY_INTERVAL,
                    "connect failed; retrying"
                ),
            }

            tokio::select! {
                _ = ticker.tick() => continue,
                _ = shutdown.cancelled() => return,
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_receiver(&self) -> MutexGuard<'_, Option<mpsc::Receiver<()>>> {
        self.reconnect_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
