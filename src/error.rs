use thiserror::Error;

use crate::config::ConfigError;
use crate::core::CoreError;

/// How a failed operation behaves under retry.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transience {
    /// The same call fails again until inputs change. Invariant violations
    /// (bad id, inheritance cycle) are always permanent.
    Permanent,
    /// The failure was environmental; a later attempt can succeed.
    Retryable,
    /// Cannot tell from the error alone.
    Unknown,
}

impl Transience {
    pub fn is_retryable(self) -> bool {
        matches!(self, Transience::Retryable)
    }
}

/// Whether state changed before the error was returned. Core operations
/// validate before mutating, so their failures leave nothing applied.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Effect {
    /// Nothing was applied.
    None,
    /// The operation got partway; callers must reconcile.
    Some,
    /// Cannot tell from the error alone.
    Unknown,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::None => "none",
            Effect::Some => "some",
            Effect::Unknown => "unknown",
        }
    }
}

/// Crate-level error: a thin aggregation of the capability errors, each kept
/// transparent so callers can still match on the underlying variant.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    pub fn transience(&self) -> Transience {
        match self {
            Error::Core(e) => e.transience(),
            Error::Config(e) => e.transience(),
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            Error::Core(e) => e.effect(),
            Error::Config(e) => e.effect(),
        }
    }
}
