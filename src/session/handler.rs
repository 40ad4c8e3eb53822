//! The handler pipeline
//!
//! Each handler owns one flag concern. On every tick it re-queries the
//! resolver for its flags and applies its side effect only when the resolved
//! value differs from the last one it applied.

use tracing::warn;

use crate::core::{FlagRegistry, RegionQuerySet};

use super::host::{OnlineSubject, SubjectEffects};

/// Everything one handler invocation sees: the subject, the covering set at
/// its position, flag metadata, the effect sink, and whether the subject
/// bypasses protection.
pub struct TickContext<'a> {
    pub subject: &'a dyn OnlineSubject,
    pub set: &'a RegionQuerySet,
    pub flags: &'a FlagRegistry,
    pub effects: &'a mut dyn SubjectEffects,
    pub bypassed: bool,
}

/// One flag concern within a session.
pub trait Handler: Send {
    /// Prime internal state against the current set. No side effects.
    fn initialize(&mut self, cx: &mut TickContext<'_>) {
        let _ = cx;
    }

    /// The subject rejoined; state from before the gap is stale.
    fn reset(&mut self, cx: &mut TickContext<'_>) {
        self.initialize(cx);
    }

    fn tick(&mut self, cx: &mut TickContext<'_>);
}

type CreateFn = Box<dyn Fn() -> Box<dyn Handler> + Send + Sync>;

/// Creates per-session instances of one handler.
pub struct HandlerFactory {
    id: String,
    ships_by_default: bool,
    create: CreateFn,
}

impl HandlerFactory {
    pub fn new(
        id: impl Into<String>,
        create: impl Fn() -> Box<dyn Handler> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            ships_by_default: false,
            create: Box::new(create),
        }
    }

    pub(crate) fn builtin(
        id: &str,
        create: impl Fn() -> Box<dyn Handler> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.to_string(),
            ships_by_default: true,
            create: Box::new(create),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ships_by_default(&self) -> bool {
        self.ships_by_default
    }
}

/// Ordered list of handler factories. Order is significant: handlers run in
/// registration order within every session.
#[derive(Default)]
pub struct HandlerRegistry {
    factories: Vec<HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default pipeline. Game mode runs before invincibility so a mode
    /// change lands before vulnerability is re-evaluated against it.
    pub fn builtin() -> Self {
        use super::handlers::*;

        let mut registry = Self::new();
        registry.push(HandlerFactory::builtin("notify", || {
            Box::new(NotifyHandler::new())
        }));
        registry.push(HandlerFactory::builtin("heal", || {
            Box::new(HealHandler::new())
        }));
        registry.push(HandlerFactory::builtin("feed", || {
            Box::new(FeedHandler::new())
        }));
        registry.push(HandlerFactory::builtin("game-mode", || {
            Box::new(GameModeHandler::new())
        }));
        registry.push(HandlerFactory::builtin("invincibility", || {
            Box::new(InvincibilityHandler::new())
        }));
        registry.push(HandlerFactory::builtin("time-lock", || {
            Box::new(TimeLockHandler::new())
        }));
        registry.push(HandlerFactory::builtin("weather-lock", || {
            Box::new(WeatherLockHandler::new())
        }));
        registry
    }

    fn push(&mut self, factory: HandlerFactory) {
        self.factories.push(factory);
    }

    /// Register a factory, placing it directly after the named one, or at
    /// the end when `after` is absent or unknown. A factory with the same id
    /// replaces the existing one in place.
    pub fn register(&mut self, factory: HandlerFactory, after: Option<&str>) {
        if let Some(pos) = self.position(factory.id()) {
            self.factories[pos] = factory;
            return;
        }
        match after.and_then(|id| self.position(id)) {
            Some(pos) => self.factories.insert(pos + 1, factory),
            None => self.factories.push(factory),
        }
    }

    /// Remove a factory by id. Removing a default-shipped factory is legal
    /// but loud, since it usually indicates a host misconfiguration.
    pub fn unregister(&mut self, id: &str) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        if self.factories[pos].ships_by_default() {
            warn!(handler = id, "unregistering a default handler");
        }
        self.factories.remove(pos);
        true
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.factories.iter().position(|f| f.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.iter().map(HandlerFactory::id)
    }

    /// Fresh handler instances in registration order.
    pub fn instantiate(&self) -> Vec<Box<dyn Handler>> {
        self.factories.iter().map(|f| (f.create)()).collect()
    }
}
