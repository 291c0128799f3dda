//! Store configuration and process-level setup.
//!
//! - [`StoreOptions`] - construction-time configuration for a [`Store`](crate::Store)
//! - [`setup_tracing`] - initializes the tracing/logging infrastructure

pub mod options;
pub mod tracing;

pub use options::*;
pub use tracing::*;
