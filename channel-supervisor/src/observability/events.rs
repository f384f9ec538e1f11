//! Canonical structured event names used across the supervisor.

// Connection lifecycle events.
pub const CONNECT_ATTEMPT_FAILED: &str = "connect_attempt_failed";
pub const CONNECT_OK: &str = "connect_ok";
pub const RECONNECT_SIGNALED: &str = "reconnect_signaled";
pub const RECONNECT_SIGNAL_COALESCED: &str = "reconnect_signal_coalesced";
pub const RECONNECT_ALREADY_IN_PROGRESS: &str = "reconnect_already_in_progress";
pub const CONNECTION_WORKER_STOPPED: &str = "connection_worker_stopped";

// Ingress and publish events.
pub const INGRESS_RECEIVE: &str = "ingress_receive";
pub const INGRESS_HOST_NOT_FOUND: &str = "ingress_host_not_found";
pub const PUBLISH_OK: &str = "publish_ok";
pub const PUBLISH_FAILED: &str = "publish_failed";

// Reconcile lifecycle events.
pub const RECONCILE_START: &str = "reconcile_start";
pub const RECONCILE_CHANNEL_ABSENT: &str = "reconcile_channel_absent";
pub const SUBSCRIPTION_ALREADY_ACTIVE: &str = "subscription_already_active";
pub const SUBSCRIBE_OK: &str = "subscribe_ok";
pub const SUBSCRIBE_FAILED: &str = "subscribe_failed";
pub const UNSUBSCRIBE_START: &str = "unsubscribe_start";
pub const UNSUBSCRIBE_FAILED: &str = "unsubscribe_failed";

// Host-map events.
pub const HOST_MAP_REBUILD_OK: &str = "host_map_rebuild_ok";
pub const HOST_MAP_REBUILD_REJECTED: &str = "host_map_rebuild_rejected";

// Delivery and dispatch events.
pub const DELIVERY_RECEIVED: &str = "delivery_received";
pub const DELIVERY_DECODE_FAILED: &str = "delivery_decode_failed";
pub const DELIVERY_PANIC: &str = "delivery_panic";
pub const DISPATCH_OK: &str = "dispatch_ok";
pub const DISPATCH_FAILED: &str = "dispatch_failed";
pub const ACK_FAILED: &str = "ack_failed";
pub const MESSAGE_DISPATCHED: &str = "message_dispatched";
