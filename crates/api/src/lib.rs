//! # Marquee API
//!
//! HTTP surface and command-line entry points for the Marquee event
//! catalog: dependency wiring, the axum router, and the clap CLI.

pub mod cli;
pub mod context;
pub mod routes;

pub use context::AppContext;
pub use routes::router;
