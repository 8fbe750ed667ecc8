//! # Marquee Core
//!
//! Business logic for the Marquee event catalog: the reconciliation
//! (sync) engine, record validation, the credential service, and the
//! port traits that infrastructure adapters implement.
//!
//! ## Architecture
//! - Depends only on `marquee-domain` and external crates
//! - All I/O goes through port traits (`async-trait`)
//! - Validation and reconciliation are pure and unit-testable

pub mod auth;
pub mod catalog;
pub mod sync;

pub use auth::ports::{TokenRecord, TokenRepository, UserCredentials, UserRepository};
pub use auth::service::{AuthService, TokenPair};
pub use catalog::ports::{EventRepository, SyncResultRepository, VenueRepository};
pub use sync::ports::{EventFeed, FeedBatch};
pub use sync::{SyncOptions, SyncReport, SyncService};
