//! Per-subject sessions and the handler pipeline
//!
//! The host owns subjects, events, and the tick cadence; this module owns
//! what happens on each tick: resolve the covering region set at the
//! subject's position, hand it to the session's handlers, and let each
//! handler apply its flag-driven side effect through the injected sink.
//!
//! - host: the interfaces the embedding host implements
//! - handler: the `Handler` trait, tick context, and the ordered registry
//! - handlers: the builtin flag handlers
//! - session: per-subject fan-out over handler instances
//! - manager: TTL-cached sessions, ticking, bypass memoization, and the
//!   out-of-cadence re-evaluation entry point
//! - scheduler: the per-subject trigger coalescing behind it

pub mod handler;
pub mod handlers;
pub mod host;
pub mod manager;
pub mod scheduler;
pub mod session;

pub use handler::{Handler, HandlerFactory, HandlerRegistry, TickContext};
pub use host::{OnlineSubject, PermissionLookup, SubjectEffects};
pub use manager::SessionManager;
pub use scheduler::ReevalScheduler;
pub use session::Session;
