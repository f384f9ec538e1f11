//! Event envelope carried between HTTP ingress and the backend wire.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Context attribute header prefix of binary-mode events.
pub const ATTRIBUTE_PREFIX: &str = "ce-";

const ID_ATTRIBUTE: &str = "ce-id";

/// One event in transit: its context attributes (the lowercased `ce-*`
/// headers of binary HTTP mode), the declared content type, and the opaque
/// payload.
///
/// The JSON form produced by [`EventMessage::to_wire`] is the backend payload
/// for the channel subject, so it is shared with every peer publishing to the
/// same backend.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct EventMessage {
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub payload: Vec<u8>,
}

impl EventMessage {
    pub fn new(
        attributes: BTreeMap<String, String>,
        content_type: Option<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            attributes,
            content_type,
            payload,
        }
    }

    /// The event id attribute, used as message identity in diagnostics.
    pub fn event_id(&self) -> Option<&str> {
        self.attributes.get(ID_ATTRIBUTE).map(String::as_str)
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_wire(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}
