//! Atomically swappable hostname→channel routing table.

use crate::channel::{ChannelEntry, ChannelReference};
use crate::error::SupervisorError;
use crate::observability::events;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

const COMPONENT: &str = "host_router";

type HostToChannelMap = HashMap<String, ChannelReference>;

/// Maps the HTTP `Host` header of inbound requests to a channel reference.
///
/// Reads are lock-free: one atomic load and a map lookup. Writes replace the
/// whole map, so readers observe either the old or the new snapshot, never a
/// partially built one.
pub(crate) struct HostChannelRouter {
    map: ArcSwap<HostToChannelMap>,
}

impl HostChannelRouter {
    pub(crate) fn new() -> Self {
        Self {
            map: ArcSwap::from_pointee(HostToChannelMap::new()),
        }
    }

    pub(crate) fn resolve(&self, hostname: &str) -> Result<ChannelReference, SupervisorError> {
        self.map
            .load()
            .get(hostname)
            .cloned()
            .ok_or_else(|| SupervisorError::HostNotFound {
                hostname: hostname.to_string(),
            })
    }

    /// Rebuilds the routing table from the full channel list.
    ///
    /// A duplicate hostname fails the whole rebuild and leaves the installed
    /// map untouched: ambiguous routing is worse than stale routing.
    pub(crate) fn rebuild(&self, channels: &[ChannelEntry]) -> Result<(), SupervisorError> {
        let mut rebuilt = HostToChannelMap::with_capacity(channels.len());
        for channel in channels {
            if let Some(existing) = rebuilt.get(&channel.hostname) {
                let err = SupervisorError::DuplicateHostname {
                    hostname: channel.hostname.clone(),
                    first: existing.clone(),
                    second: channel.reference.clone(),
                };
                warn!(
                    event = events::HOST_MAP_REBUILD_REJECTED,
                    component = COMPONENT,
                    hostname = channel.hostname.as_str(),
                    err = %err,
                    "host map rebuild rejected; previous map kept"
                );
                return Err(err);
            }
            rebuilt.insert(channel.hostname.clone(), channel.reference.clone());
        }

        self.map.store(Arc::new(rebuilt));
        info!(
            event = events::HOST_MAP_REBUILD_OK,
            component = COMPONENT,
            hosts = channels.len(),
            "host map updated"
        );
        Ok(())
    }
}
