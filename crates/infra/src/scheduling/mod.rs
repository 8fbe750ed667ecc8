//! Background services.

mod cleanup;

pub use cleanup::{CleanupConfig, CleanupService, CleanupStats};
