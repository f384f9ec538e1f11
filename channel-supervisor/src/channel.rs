//! Channel identity and the channel→subject wire mapping.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// Identity of a logical channel, keyed by namespace and name.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct ChannelReference {
    pub namespace: String,
    pub name: String,
}

impl ChannelReference {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Backend subject for this channel.
    ///
    /// The `name.namespace` form is part of the wire contract with peers that
    /// publish to the same backend; changing the delimiter is a breaking change.
    pub fn subject(&self) -> String {
        format!("{}.{}", self.name, self.namespace)
    }
}

impl Display for ChannelReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// One watched channel as reported by the control plane: its identity plus the
/// hostname its ingress address resolves to.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChannelEntry {
    pub reference: ChannelReference,
    pub hostname: String,
}

impl ChannelEntry {
    pub fn new(reference: ChannelReference, hostname: impl Into<String>) -> Self {
        Self {
            reference,
            hostname: hostname.into(),
        }
    }
}
