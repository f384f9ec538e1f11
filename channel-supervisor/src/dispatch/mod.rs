//! Outbound dispatch seam: the HTTP delivery collaborator.

use crate::message::EventMessage;
use crate::subscription::SubscriptionReference;
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

pub(crate) mod http;

pub use http::HttpDispatcher;

/// Optional routing endpoints for one delivery, derived from the
/// subscription reference; each is present iff the corresponding field of the
/// subscriber spec was non-empty.
#[derive(Clone, Debug, Default)]
pub struct DispatchDestinations {
    pub destination: Option<Url>,
    pub reply: Option<Url>,
    pub dead_letter: Option<Url>,
}

impl From<&SubscriptionReference> for DispatchDestinations {
    fn from(subscription: &SubscriptionReference) -> Self {
        Self {
            destination: subscription.subscriber_uri.clone(),
            reply: subscription.reply_uri.clone(),
            dead_letter: subscription.dead_letter_uri.clone(),
        }
    }
}

/// Opaque execution info returned by a dispatcher. The supervisor only logs
/// it; delivery success or failure is carried by the `Result` itself.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DispatchOutcome {
    pub response_code: Option<u16>,
    pub dead_lettered: bool,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no destination to dispatch to")]
    NoDestination,
    #[error("request to {url} failed: {reason}")]
    RequestFailed { url: Url, reason: String },
    #[error("destination {url} responded with status {status}")]
    UnexpectedStatus { url: Url, status: u16 },
}

/// Delivers one event to its subscriber, applying its own retry/reply/DLQ
/// policy. A returned error means the message must not be acked so the
/// backend redelivers.
#[async_trait]
pub trait MessageDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        message: &EventMessage,
        destinations: &DispatchDestinations,
    ) -> Result<DispatchOutcome, DispatchError>;
}
