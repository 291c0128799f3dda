//! # Cache Errors
//!
//! Failures of the identity cache task itself, as seen by a [`CacheClient`](super::CacheClient).

/// Errors raised while talking to the identity cache actor.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CacheError {
    #[error("Identity cache closed")]
    ActorClosed,
    #[error("Identity cache dropped response channel")]
    ActorDropped,
    #[error("Cannot cache a `{0}` record without an id")]
    MissingId(String),
}
