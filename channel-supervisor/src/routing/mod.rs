//! Ingress routing: hostname to channel identity.

pub(crate) mod host_router;
