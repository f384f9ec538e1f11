//! Subscriber identity and the derived subscription reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};
use url::Url;

/// Stable identifier of one subscriber, assigned by the control plane.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SubscriberUid(String);

impl SubscriberUid {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SubscriberUid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriberUid {
    fn from(uid: &str) -> Self {
        Self(uid.to_string())
    }
}

/// Delivery options attached to a subscriber by the control plane.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DeliverySpec {
    #[serde(default)]
    pub dead_letter_sink: Option<Url>,
}

/// Desired state for one subscriber, as handed over by the control plane.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SubscriberSpec {
    pub uid: SubscriberUid,
    #[serde(default)]
    pub subscriber_uri: Option<Url>,
    #[serde(default)]
    pub reply_uri: Option<Url>,
    #[serde(default)]
    pub delivery: Option<DeliverySpec>,
}

impl SubscriberSpec {
    pub fn new(uid: impl Into<SubscriberUid>, subscriber_uri: Option<Url>) -> Self {
        Self {
            uid: uid.into(),
            subscriber_uri,
            reply_uri: None,
            delivery: None,
        }
    }
}

impl From<String> for SubscriberUid {
    fn from(uid: String) -> Self {
        Self(uid)
    }
}

/// Resolved routing endpoints for one subscription.
///
/// The string form (the subscriber uid) is used verbatim as the backend
/// durable name, so the backend resumes the subscriber's stream position
/// across process restarts. That string is a persistence contract: it MUST
/// stay stable for a given uid across process lifetimes.
#[derive(Clone, Debug)]
pub struct SubscriptionReference {
    pub uid: SubscriberUid,
    pub subscriber_uri: Option<Url>,
    pub reply_uri: Option<Url>,
    pub dead_letter_uri: Option<Url>,
}

impl SubscriptionReference {
    pub fn durable_name(&self) -> &str {
        self.uid.as_str()
    }
}

impl From<&SubscriberSpec> for SubscriptionReference {
    fn from(spec: &SubscriberSpec) -> Self {
        Self {
            uid: spec.uid.clone(),
            subscriber_uri: spec.subscriber_uri.clone(),
            reply_uri: spec.reply_uri.clone(),
            dead_letter_uri: spec
                .delivery
                .as_ref()
                .and_then(|delivery| delivery.dead_letter_sink.clone()),
        }
    }
}

impl Display for SubscriptionReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.durable_name())
    }
}
