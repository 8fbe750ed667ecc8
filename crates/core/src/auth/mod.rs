//! Credential service: opaque bearer-token issuance for API callers.

pub mod ports;
pub mod service;
