//! Session cache, tick loop entry point, bypass memoization
//!
//! Sessions live in a TTL cache keyed by subject id; expiry is lazy (checked
//! on access and after each tick sweep). Bypass-permission answers are
//! memoized per `(world, subject)` with a short TTL so the injected lookup
//! is not hammered every tick.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::config::SessionConfig;
use crate::core::{FlagRegistry, SharedRegionIndex, SubjectId, WorldName};

use super::handler::{HandlerRegistry, TickContext};
use super::host::{OnlineSubject, PermissionLookup, SubjectEffects};
use super::scheduler::ReevalScheduler;
use super::session::Session;

struct Slot {
    session: Arc<Mutex<Session>>,
    last_access: Instant,
}

struct BypassEntry {
    value: bool,
    at: Instant,
}

/// Owns sessions and the handler registry. The host drives it: `get` on
/// subject join, `reset_state` on rejoin, `tick` on the fixed cadence.
pub struct SessionManager {
    registry: HandlerRegistry,
    sessions: Mutex<HashMap<SubjectId, Slot>>,
    bypass: Mutex<HashMap<(WorldName, SubjectId), BypassEntry>>,
    scheduler: Mutex<ReevalScheduler>,
    config: SessionConfig,
    permissions: Option<Arc<dyn PermissionLookup>>,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_registry(config, HandlerRegistry::builtin())
    }

    pub fn with_registry(config: SessionConfig, registry: HandlerRegistry) -> Self {
        Self {
            registry,
            sessions: Mutex::new(HashMap::new()),
            bypass: Mutex::new(HashMap::new()),
            scheduler: Mutex::new(ReevalScheduler::new()),
            config,
            permissions: None,
        }
    }

    /// Install the bypass-permission capability. Absent, every bypass check
    /// answers false.
    pub fn set_permissions(&mut self, permissions: Arc<dyn PermissionLookup>) {
        self.permissions = Some(permissions);
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Host-side pipeline customization. Existing sessions keep their
    /// instances until they are evicted or reset.
    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    pub fn session_count(&self) -> usize {
        self.lock_sessions().len()
    }

    /// Whether the subject bypasses protection, memoized per world with the
    /// configured TTL.
    pub fn has_bypass(&self, subject: &dyn OnlineSubject) -> bool {
        let key = (subject.world().clone(), subject.id());
        let mut cache = self.lock_bypass();
        if let Some(entry) = cache.get(&key) {
            if entry.at.elapsed() < self.config.bypass_ttl() {
                return entry.value;
            }
        }
        let value = self
            .permissions
            .as_ref()
            .is_some_and(|p| p.has_bypass(subject, subject.world()));
        cache.insert(
            key,
            BypassEntry {
                value,
                at: Instant::now(),
            },
        );
        value
    }

    /// Drop memoized bypass answers for one subject across all worlds.
    pub fn invalidate_bypass(&self, subject: SubjectId) {
        self.lock_bypass().retain(|(_, id), _| *id != subject);
    }

    /// The subject's session, creating and initializing one when absent or
    /// expired. Refreshes the idle clock.
    pub fn get(
        &self,
        subject: &dyn OnlineSubject,
        index: &SharedRegionIndex,
        flags: &FlagRegistry,
        effects: &mut dyn SubjectEffects,
    ) -> Arc<Mutex<Session>> {
        let id = subject.id();
        let now = Instant::now();
        let (session, fresh) = {
            let mut sessions = self.lock_sessions();
            match sessions.get_mut(&id) {
                Some(slot) if slot.last_access.elapsed() < self.config.lifetime() => {
                    slot.last_access = now;
                    (slot.session.clone(), false)
                }
                _ => {
                    let session =
                        Arc::new(Mutex::new(Session::new(id, self.registry.instantiate())));
                    sessions.insert(
                        id,
                        Slot {
                            session: session.clone(),
                            last_access: now,
                        },
                    );
                    (session, true)
                }
            }
        };
        if fresh {
            let set = index.query(subject.position());
            let bypassed = self.has_bypass(subject);
            lock(&session).initialize(&mut TickContext {
                subject,
                set: &set,
                flags,
                effects,
                bypassed,
            });
        }
        session
    }

    /// The subject's session if one is cached and unexpired. Never creates;
    /// does not refresh the idle clock.
    pub fn get_if_present(&self, id: SubjectId) -> Option<Arc<Mutex<Session>>> {
        let mut sessions = self.lock_sessions();
        match sessions.get(&id) {
            Some(slot) if slot.last_access.elapsed() < self.config.lifetime() => {
                Some(slot.session.clone())
            }
            Some(_) => {
                sessions.remove(&id);
                None
            }
            None => None,
        }
    }

    /// The subject rejoined: re-run handler resets and drop its memoized
    /// bypass answers.
    pub fn reset_state(
        &self,
        subject: &dyn OnlineSubject,
        index: &SharedRegionIndex,
        flags: &FlagRegistry,
        effects: &mut dyn SubjectEffects,
    ) {
        self.invalidate_bypass(subject.id());
        let session = self.get(subject, index, flags, effects);
        let set = index.query(subject.position());
        let bypassed = self.has_bypass(subject);
        lock(&session).reset_state(&mut TickContext {
            subject,
            set: &set,
            flags,
            effects,
            bypassed,
        });
    }

    /// One cadence step: tick every online subject's session against the
    /// covering set at its position, then sweep out idle sessions.
    pub fn tick(
        &self,
        subjects: &[&dyn OnlineSubject],
        index: &SharedRegionIndex,
        flags: &FlagRegistry,
        effects: &mut dyn SubjectEffects,
    ) {
        for &subject in subjects {
            self.tick_subject(subject, index, flags, &mut *effects);
        }
        self.evict_idle();
    }

    /// Request an out-of-cadence re-evaluation for the subject, coalesced
    /// over the scheduler's delay window.
    pub fn schedule_reevaluation(&self, subject: SubjectId) {
        self.lock_scheduler().schedule(subject);
    }

    /// [`schedule_reevaluation`](Self::schedule_reevaluation) with an
    /// explicit delay. An earlier pending deadline for the subject wins.
    pub fn schedule_reevaluation_after(&self, subject: SubjectId, delay: std::time::Duration) {
        self.lock_scheduler().schedule_after(subject, delay);
    }

    /// Drop a pending re-evaluation trigger, typically because the subject
    /// left.
    pub fn cancel_reevaluation(&self, subject: SubjectId) {
        self.lock_scheduler().cancel(subject);
    }

    /// Tick the sessions of subjects whose re-evaluation window has closed.
    /// The host calls this between cadence ticks, passing the currently
    /// online subjects; due subjects no longer among them are skipped.
    pub fn reevaluate(
        &self,
        subjects: &[&dyn OnlineSubject],
        index: &SharedRegionIndex,
        flags: &FlagRegistry,
        effects: &mut dyn SubjectEffects,
    ) {
        let due = self.lock_scheduler().due();
        if due.is_empty() {
            return;
        }
        for &subject in subjects {
            if due.contains(&subject.id()) {
                self.tick_subject(subject, index, flags, &mut *effects);
            }
        }
    }

    fn tick_subject(
        &self,
        subject: &dyn OnlineSubject,
        index: &SharedRegionIndex,
        flags: &FlagRegistry,
        effects: &mut dyn SubjectEffects,
    ) {
        let session = self.get(subject, index, flags, &mut *effects);
        let set = index.query(subject.position());
        let bypassed = self.has_bypass(subject);
        lock(&session).tick(&mut TickContext {
            subject,
            set: &set,
            flags,
            effects,
            bypassed,
        });
    }

    fn evict_idle(&self) {
        let lifetime = self.config.lifetime();
        self.lock_sessions()
            .retain(|_, slot| slot.last_access.elapsed() < lifetime);
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<SubjectId, Slot>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_bypass(&self) -> MutexGuard<'_, HashMap<(WorldName, SubjectId), BypassEntry>> {
        self.bypass.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_scheduler(&self) -> MutexGuard<'_, ReevalScheduler> {
        self.scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock(session: &Arc<Mutex<Session>>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}
