//! Domain model for locus
//!
//! Error types shared by the filter, registration and configuration layers.
//! The contract types handed to the sampler live in `locus-common`.

pub mod errors;

// Re-export common types for convenience
pub use locus_common::{ResolvedLocation, ThreadId};

pub use errors::{ConfigError, DispatchError, RegistrationError};
