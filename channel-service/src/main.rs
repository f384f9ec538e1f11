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

mod config;

use crate::config::{ChannelConfig, Config};
use anyhow::Context;
use channel_supervisor::{HttpDispatcher, SubscriptionSupervisor, SupervisorArgs};
use clap::Parser;
use jetstream_backend::JetStreamBackend;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command()]
struct ServiceArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let args = ServiceArgs::parse();
    let config_contents = std::fs::read_to_string(&args.config)
        .with_context(|| format!("unable to read config file {}", args.config))?;
    let config: Config =
        json5::from_str(&config_contents).context("unable to parse config file")?;

    let supervisor = Arc::new(SubscriptionSupervisor::new(SupervisorArgs {
        natss_url: config.supervisor.natss_url.clone(),
        cluster_id: config.supervisor.cluster_id.clone(),
        client_id: config.supervisor.client_id.clone(),
        ack_wait_minutes: config.supervisor.ack_wait_minutes,
        max_inflight: config.supervisor.max_inflight,
        backend: Arc::new(JetStreamBackend::new()),
        dispatcher: Arc::new(HttpDispatcher::new()),
        reporter: None,
    }));

    let entries: Vec<_> = config.channels.iter().map(ChannelConfig::entry).collect();
    supervisor.process_channels(&entries)?;

    let listener = tokio::net::TcpListener::bind(&config.ingress.listen_address)
        .await
        .with_context(|| format!("unable to bind {}", config.ingress.listen_address))?;
    info!(
        listen_address = config.ingress.listen_address.as_str(),
        natss_url = config.supervisor.natss_url.as_str(),
        "channel service starting"
    );

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("shutdown signal received");
                shutdown.cancel();
            }
        });
    }

    {
        let supervisor = supervisor.clone();
        let channels = config.channels.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            apply_static_subscriptions(supervisor, channels, shutdown).await;
        });
    }

    supervisor.start(listener, shutdown).await?;
    Ok(())
}

/// Reconciles the statically configured subscriber sets until every channel
/// converges. Retries ride on the connection worker's own convergence.
async fn apply_static_subscriptions(
    supervisor: Arc<SubscriptionSupervisor>,
    channels: Vec<ChannelConfig>,
    shutdown: CancellationToken,
) {
    let mut pending: Vec<&ChannelConfig> = channels
        .iter()
        .filter(|channel| !channel.subscribers.is_empty())
        .collect();

    while !pending.is_empty() {
        let mut still_pending = Vec::new();
        for channel in pending {
            let subscribers = channel.subscriber_specs();
            match supervisor
                .update_subscriptions(&channel.name, &channel.namespace, &subscribers, false)
                .await
            {
                Ok(failures) if failures.is_empty() => {
                    info!(
                        namespace = channel.namespace.as_str(),
                        name = channel.name.as_str(),
                        subscribers = subscribers.len(),
                        "static subscriptions applied"
                    );
                }
                Ok(failures) => {
                    for (uid, err) in &failures {
                        warn!(
                            namespace = channel.namespace.as_str(),
                            name = channel.name.as_str(),
                            subscription_uid = uid.as_str(),
                            err = %err,
                            "static subscription not yet applied"
                        );
                    }
                    still_pending.push(channel);
                }
                Err(err) => {
                    error!(
                        namespace = channel.namespace.as_str(),
                        name = channel.name.as_str(),
                        err = %err,
                        "static subscription reconcile failed"
                    );
                    still_pending.push(channel);
                }
            }
        }
        pending = still_pending;
        if pending.is_empty() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            _ = shutdown.cancelled() => return,
        }
    }
}
