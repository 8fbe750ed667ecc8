//! Catalog read model and persistence ports.

pub mod ports;
