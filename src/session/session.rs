//! Per-subject session state

use crate::core::SubjectId;

use super::handler::{Handler, TickContext};

/// One subject's handler instances. Lifecycle calls fan out to handlers in
/// registry order.
pub struct Session {
    subject: SubjectId,
    handlers: Vec<Box<dyn Handler>>,
}

impl Session {
    pub(crate) fn new(subject: SubjectId, handlers: Vec<Box<dyn Handler>>) -> Self {
        Self { subject, handlers }
    }

    pub fn subject(&self) -> SubjectId {
        self.subject
    }

    /// First acquisition: prime handler state against the current set.
    pub fn initialize(&mut self, cx: &mut TickContext<'_>) {
        for handler in &mut self.handlers {
            handler.initialize(cx);
        }
    }

    /// The subject rejoined; stale handler state must not leak across the
    /// gap.
    pub fn reset_state(&mut self, cx: &mut TickContext<'_>) {
        for handler in &mut self.handlers {
            handler.reset(cx);
        }
    }

    pub fn tick(&mut self, cx: &mut TickContext<'_>) {
        for handler in &mut self.handlers {
            handler.tick(cx);
        }
    }
}
