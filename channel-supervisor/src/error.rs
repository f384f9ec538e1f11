//! Supervisor error kinds.

use crate::backend::BackendError;
use crate::channel::ChannelReference;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    /// No live backend connection exists. Callers fail fast; the connection
    /// worker is expected to be converging in the background.
    #[error("no connection to the streaming backend")]
    ConnectionUnavailable,

    /// The backend reported the connection closed mid-operation. Always paired
    /// with a reconnect signal by the code path that observed it.
    #[error("connection to the streaming backend has been lost, attempting to reconnect")]
    ConnectionLost,

    #[error("publish to subject {subject} failed: {source}")]
    PublishFailed {
        subject: String,
        #[source]
        source: BackendError,
    },

    #[error("subscribe with durable name {durable_name} failed: {source}")]
    SubscribeFailed {
        durable_name: String,
        #[source]
        source: BackendError,
    },

    #[error("unsubscribe of durable name {durable_name} failed: {source}")]
    UnsubscribeFailed {
        durable_name: String,
        #[source]
        source: BackendError,
    },

    /// Host-map rebuild rejection. Ambiguous routing is worse than stale
    /// routing, so the whole rebuild fails and the current map stays in place.
    #[error(
        "duplicate hostName found. Each channel must have a unique host header. \
         HostName:{hostname}, channel:{second}, channel:{first}"
    )]
    DuplicateHostname {
        hostname: String,
        first: ChannelReference,
        second: ChannelReference,
    },

    #[error("invalid HostName:{hostname:?}. HostName not found in any of the watched channels")]
    HostNotFound { hostname: String },

    #[error("malformed event payload: {0}")]
    MalformedEvent(#[from] serde_json::Error),

    #[error("ingress server failed: {0}")]
    Ingress(#[from] std::io::Error),
}
