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

use channel_supervisor::{ChannelEntry, ChannelReference, DeliverySpec, SubscriberSpec};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub(crate) supervisor: SupervisorConfig,
    pub(crate) ingress: IngressConfig,
    /// Statically configured channels, applied at boot. A live control plane
    /// replaces these through the supervisor API at runtime.
    #[serde(default)]
    pub(crate) channels: Vec<ChannelConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct SupervisorConfig {
    pub(crate) natss_url: String,
    pub(crate) cluster_id: String,
    pub(crate) client_id: String,
    pub(crate) ack_wait_minutes: u64,
    pub(crate) max_inflight: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct IngressConfig {
    pub(crate) listen_address: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) hostname: String,
    #[serde(default)]
    pub(crate) subscribers: Vec<SubscriberConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct SubscriberConfig {
    pub(crate) uid: String,
    pub(crate) subscriber_uri: Url,
    #[serde(default)]
    pub(crate) reply_uri: Option<Url>,
    #[serde(default)]
    pub(crate) dead_letter_uri: Option<Url>,
}

impl ChannelConfig {
    pub(crate) fn entry(&self) -> ChannelEntry {
        ChannelEntry::new(
            ChannelReference::new(self.namespace.clone(), self.name.clone()),
            self.hostname.clone(),
        )
    }

    pub(crate) fn subscriber_specs(&self) -> Vec<SubscriberSpec> {
        self.subscribers
            .iter()
            .map(|subscriber| SubscriberSpec {
                uid: subscriber.uid.clone().into(),
                subscriber_uri: Some(subscriber.subscriber_uri.clone()),
                reply_uri: subscriber.reply_uri.clone(),
                delivery: subscriber
                    .dead_letter_uri
                    .clone()
                    .map(|dead_letter_sink| DeliverySpec {
                        dead_letter_sink: Some(dead_letter_sink),
                    }),
            })
            .collect()
    }
}
