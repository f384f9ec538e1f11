//! Data plane: HTTP ingress publishing and backend delivery dispatch.

pub(crate) mod egress;
pub(crate) mod ingress;
