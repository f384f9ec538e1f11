//! Stats-reporting seam for deployments that wire up a metrics sink.

use crate::channel::ChannelReference;

/// Receives the outcome of each ingress request. The default is a no-op;
/// metrics backends are wired in by the hosting process.
pub trait StatsReporter: Send + Sync {
    fn event_received(&self, channel: Option<&ChannelReference>, response_code: u16);
}

/// Discards every report.
pub struct NopReporter;

impl StatsReporter for NopReporter {
    fn event_received(&self, _channel: Option<&ChannelReference>, _response_code: u16) {}
}
