//! Core capability errors (id validation, hierarchy invariants).
//!
//! These are bounded and stable: core errors represent domain/refusal states,
//! not library implementation details. Lookup misses are `Option`, never
//! errors.

use thiserror::Error;

use crate::error::{Effect, Transience};

/// Invalid identifier.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum InvalidId {
    #[error("region id `{raw}` is invalid: {reason}")]
    Region { raw: String, reason: String },
    #[error("flag id `{raw}` is invalid: {reason}")]
    Flag { raw: String, reason: String },
    #[error("group name `{raw}` is invalid: {reason}")]
    Group { raw: String, reason: String },
    #[error("world name `{raw}` is invalid: {reason}")]
    World { raw: String, reason: String },
}

/// Parent assignment that would make the region graph cyclic.
///
/// Raised before any state changes; the existing parent link is untouched.
#[derive(Debug, Error, Clone)]
#[error("cannot set `{parent}` as parent of `{region}`: it would create a cycle")]
pub struct CircularInheritance {
    pub region: String,
    pub parent: String,
}

/// Region id not present in the index.
#[derive(Debug, Error, Clone)]
#[error("unknown region `{id}`")]
pub struct UnknownRegion {
    pub id: String,
}

/// Canonical error enum for the core capability.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum CoreError {
    #[error(transparent)]
    InvalidId(#[from] InvalidId),
    #[error(transparent)]
    CircularInheritance(#[from] CircularInheritance),
    #[error(transparent)]
    UnknownRegion(#[from] UnknownRegion),
}

impl CoreError {
    pub fn transience(&self) -> Transience {
        // Core errors are pure domain/input failures.
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}
