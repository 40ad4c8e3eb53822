//! Interfaces the embedding host implements
//!
//! The engine never talks to a world directly. Hosts hand in live subject
//! handles, receive side effects through a sink, and answer bypass
//! permission checks.

use crate::core::{BlockPos, Subject, SubjectId, WorldName};

/// A live, online subject handle.
pub trait OnlineSubject: Subject {
    fn name(&self) -> &str;
    fn world(&self) -> &WorldName;
    fn position(&self) -> BlockPos;
    /// Host-defined game mode token (matched against the `game-mode` flag).
    fn game_mode(&self) -> &str;
}

/// Side-effect sink. Handlers never touch the world except through this.
pub trait SubjectEffects {
    fn send_message(&mut self, subject: SubjectId, message: &str);
    /// Negative amounts harm.
    fn heal(&mut self, subject: SubjectId, amount: f64);
    /// Negative amounts starve.
    fn feed(&mut self, subject: SubjectId, amount: f64);
    fn set_invulnerable(&mut self, subject: SubjectId, invulnerable: bool);
    fn set_game_mode(&mut self, subject: SubjectId, mode: &str);
    /// `None` releases the lock.
    fn set_time_lock(&mut self, subject: SubjectId, time: Option<i64>);
    /// `None` releases the lock.
    fn set_weather_lock(&mut self, subject: SubjectId, weather: Option<&str>);
}

/// Injected bypass-permission capability. Resolution of permission strings
/// stays on the host side; the engine only memoizes answers.
pub trait PermissionLookup: Send + Sync {
    fn has_bypass(&self, subject: &dyn OnlineSubject, world: &WorldName) -> bool;
}
