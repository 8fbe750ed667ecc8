//! Upstream event provider integration.

mod client;

pub use client::ProviderClient;
