//! Control-plane state: the per-channel subscription registry.

pub(crate) mod subscription_registry;
