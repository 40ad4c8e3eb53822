//! Builtin flag handlers
//!
//! Each handler keeps the last value it applied and only touches the effect
//! sink when the resolved value moves. Protection-style handlers skip
//! bypassing subjects; ambience handlers (time, weather) apply regardless.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::core::{RegionQuerySet, State, Subject};

use super::handler::{Handler, TickContext};

fn set_keys(set: &RegionQuerySet) -> BTreeSet<String> {
    set.iter().map(|r| r.id().normalized()).collect()
}

/// Greeting and farewell messages on region-set change. The farewell is
/// resolved against the set the subject was in on the previous tick.
pub struct NotifyHandler {
    prev: Option<(BTreeSet<String>, RegionQuerySet)>,
}

impl NotifyHandler {
    pub fn new() -> Self {
        Self { prev: None }
    }
}

impl Default for NotifyHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for NotifyHandler {
    fn initialize(&mut self, cx: &mut TickContext<'_>) {
        self.prev = Some((set_keys(cx.set), cx.set.clone()));
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) {
        let keys = set_keys(cx.set);
        if self.prev.as_ref().is_some_and(|(k, _)| *k == keys) {
            return;
        }
        let subject: &dyn Subject = cx.subject;
        let id = cx.subject.id();

        if let Some((_, prev_set)) = self.prev.take() {
            if let Some(def) = cx.flags.get_by_name("farewell") {
                let farewell = prev_set
                    .query_value(Some(subject), def)
                    .and_then(|v| v.as_text().map(str::to_owned));
                if let Some(text) = farewell {
                    cx.effects.send_message(id, &text);
                }
            }
        }
        if let Some(def) = cx.flags.get_by_name("greeting") {
            let greeting = cx
                .set
                .query_value(Some(subject), def)
                .and_then(|v| v.as_text().map(str::to_owned));
            if let Some(text) = greeting {
                cx.effects.send_message(id, &text);
            }
        }
        self.prev = Some((keys, cx.set.clone()));
    }
}

/// Resolve an amount flag plus its delay flag. `None` when the amount flag
/// does not resolve or the amount is zero.
fn resolve_periodic(
    cx: &TickContext<'_>,
    amount_flag: &str,
    delay_flag: &str,
) -> Option<(f64, Duration)> {
    let subject: &dyn Subject = cx.subject;
    let amount = cx
        .flags
        .get_by_name(amount_flag)
        .and_then(|def| cx.set.query_value(Some(subject), def))
        .and_then(|v| v.as_float())?;
    if amount == 0.0 {
        return None;
    }
    let delay = cx
        .flags
        .get_by_name(delay_flag)
        .and_then(|def| cx.set.query_value_or_default(Some(subject), def))
        .and_then(|v| v.as_int())
        .unwrap_or(1)
        .max(0);
    Some((amount, Duration::from_secs(delay as u64)))
}

/// `heal-amount` / `heal-delay`, wall-clock throttled. Negative amounts harm.
pub struct HealHandler {
    last: Option<Instant>,
}

impl HealHandler {
    pub fn new() -> Self {
        Self { last: None }
    }
}

impl Default for HealHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for HealHandler {
    fn tick(&mut self, cx: &mut TickContext<'_>) {
        if cx.bypassed {
            return;
        }
        let Some((amount, delay)) = resolve_periodic(cx, "heal-amount", "heal-delay") else {
            self.last = None;
            return;
        };
        let now = Instant::now();
        if self.last.is_some_and(|t| now.duration_since(t) < delay) {
            return;
        }
        cx.effects.heal(cx.subject.id(), amount);
        self.last = Some(now);
    }
}

/// `feed-amount` / `feed-delay`, wall-clock throttled. Negative amounts
/// starve.
pub struct FeedHandler {
    last: Option<Instant>,
}

impl FeedHandler {
    pub fn new() -> Self {
        Self { last: None }
    }
}

impl Default for FeedHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for FeedHandler {
    fn tick(&mut self, cx: &mut TickContext<'_>) {
        if cx.bypassed {
            return;
        }
        let Some((amount, delay)) = resolve_periodic(cx, "feed-amount", "feed-delay") else {
            self.last = None;
            return;
        };
        let now = Instant::now();
        if self.last.is_some_and(|t| now.duration_since(t) < delay) {
            return;
        }
        cx.effects.feed(cx.subject.id(), amount);
        self.last = Some(now);
    }
}

/// Applies the `game-mode` flag, remembering the subject's own mode from the
/// first forced change and restoring it when the flag stops resolving.
pub struct GameModeHandler {
    original: Option<String>,
    applied: Option<String>,
}

impl GameModeHandler {
    pub fn new() -> Self {
        Self {
            original: None,
            applied: None,
        }
    }
}

impl Default for GameModeHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for GameModeHandler {
    fn initialize(&mut self, _cx: &mut TickContext<'_>) {
        self.original = None;
        self.applied = None;
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) {
        let subject: &dyn Subject = cx.subject;
        let resolved = if cx.bypassed {
            None
        } else {
            cx.flags
                .get_by_name("game-mode")
                .and_then(|def| cx.set.query_value(Some(subject), def))
                .and_then(|v| v.as_text().map(str::to_owned))
        };
        match resolved {
            Some(mode) => {
                if self.applied.as_deref() != Some(mode.as_str()) {
                    if self.original.is_none() {
                        self.original = Some(cx.subject.game_mode().to_string());
                    }
                    cx.effects.set_game_mode(cx.subject.id(), &mode);
                    self.applied = Some(mode);
                }
            }
            None => {
                if let Some(original) = self.original.take() {
                    cx.effects.set_game_mode(cx.subject.id(), &original);
                }
                self.applied = None;
            }
        }
    }
}

/// `invincible` state flag, diffed against the last applied value.
pub struct InvincibilityHandler {
    applied: Option<bool>,
}

impl InvincibilityHandler {
    pub fn new() -> Self {
        Self { applied: None }
    }
}

impl Default for InvincibilityHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for InvincibilityHandler {
    fn initialize(&mut self, _cx: &mut TickContext<'_>) {
        // Hosts start subjects vulnerable.
        self.applied = Some(false);
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) {
        let subject: &dyn Subject = cx.subject;
        let desired = !cx.bypassed
            && cx
                .flags
                .get_by_name("invincible")
                .and_then(|def| cx.set.query_value(Some(subject), def))
                .and_then(|v| v.as_state())
                .is_some_and(|s| s == State::Allow);
        if self.applied != Some(desired) {
            cx.effects.set_invulnerable(cx.subject.id(), desired);
            self.applied = Some(desired);
        }
    }
}

/// `time-lock` flag: apply on change, release when it stops resolving.
pub struct TimeLockHandler {
    applied: Option<i64>,
}

impl TimeLockHandler {
    pub fn new() -> Self {
        Self { applied: None }
    }
}

impl Default for TimeLockHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for TimeLockHandler {
    fn tick(&mut self, cx: &mut TickContext<'_>) {
        let subject: &dyn Subject = cx.subject;
        let resolved = cx
            .flags
            .get_by_name("time-lock")
            .and_then(|def| cx.set.query_value(Some(subject), def))
            .and_then(|v| v.as_int());
        match resolved {
            Some(time) if self.applied != Some(time) => {
                cx.effects.set_time_lock(cx.subject.id(), Some(time));
                self.applied = Some(time);
            }
            None if self.applied.is_some() => {
                cx.effects.set_time_lock(cx.subject.id(), None);
                self.applied = None;
            }
            _ => {}
        }
    }
}

/// `weather-lock` flag: apply on change, release when it stops resolving.
pub struct WeatherLockHandler {
    applied: Option<String>,
}

impl WeatherLockHandler {
    pub fn new() -> Self {
        Self { applied: None }
    }
}

impl Default for WeatherLockHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for WeatherLockHandler {
    fn tick(&mut self, cx: &mut TickContext<'_>) {
        let subject: &dyn Subject = cx.subject;
        let resolved = cx
            .flags
            .get_by_name("weather-lock")
            .and_then(|def| cx.set.query_value(Some(subject), def))
            .and_then(|v| v.as_text().map(str::to_owned));
        match resolved {
            Some(weather) => {
                if self.applied.as_deref() != Some(weather.as_str()) {
                    cx.effects
                        .set_weather_lock(cx.subject.id(), Some(&weather));
                    self.applied = Some(weather);
                }
            }
            None => {
                if self.applied.is_some() {
                    cx.effects.set_weather_lock(cx.subject.id(), None);
                    self.applied = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        Aabb, BlockPos, FlagEntry, FlagRegistry, FlagValue, GroupName, Region, RegionId,
        RegionIndex, RegionShape, SubjectId, WorldName,
    };
    use crate::session::host::{OnlineSubject, SubjectEffects};

    struct TestSubject {
        id: SubjectId,
        world: WorldName,
        pos: BlockPos,
        mode: String,
    }

    impl TestSubject {
        fn at(pos: BlockPos) -> Self {
            Self {
                id: SubjectId::generate(),
                world: WorldName::parse("overworld").unwrap(),
                pos,
                mode: "survival".to_string(),
            }
        }
    }

    impl Subject for TestSubject {
        fn id(&self) -> SubjectId {
            self.id
        }
        fn in_group(&self, _group: &GroupName) -> bool {
            false
        }
    }

    impl OnlineSubject for TestSubject {
        fn name(&self) -> &str {
            "tester"
        }
        fn world(&self) -> &WorldName {
            &self.world
        }
        fn position(&self) -> BlockPos {
            self.pos
        }
        fn game_mode(&self) -> &str {
            &self.mode
        }
    }

    #[derive(Default)]
    struct Recorder {
        messages: Vec<String>,
        heals: Vec<f64>,
        feeds: Vec<f64>,
        invulnerable: Vec<bool>,
        game_modes: Vec<String>,
        time_locks: Vec<Option<i64>>,
        weather_locks: Vec<Option<String>>,
    }

    impl SubjectEffects for Recorder {
        fn send_message(&mut self, _subject: SubjectId, message: &str) {
            self.messages.push(message.to_string());
        }
        fn heal(&mut self, _subject: SubjectId, amount: f64) {
            self.heals.push(amount);
        }
        fn feed(&mut self, _subject: SubjectId, amount: f64) {
            self.feeds.push(amount);
        }
        fn set_invulnerable(&mut self, _subject: SubjectId, invulnerable: bool) {
            self.invulnerable.push(invulnerable);
        }
        fn set_game_mode(&mut self, _subject: SubjectId, mode: &str) {
            self.game_modes.push(mode.to_string());
        }
        fn set_time_lock(&mut self, _subject: SubjectId, time: Option<i64>) {
            self.time_locks.push(time);
        }
        fn set_weather_lock(&mut self, _subject: SubjectId, weather: Option<&str>) {
            self.weather_locks.push(weather.map(str::to_owned));
        }
    }

    fn flagged_region(id: &str, flags: &[(&str, FlagValue)]) -> Region {
        let mut r = Region::new(
            RegionId::parse(id).unwrap(),
            RegionShape::Cuboid(Aabb::new(BlockPos::new(0, 0, 0), BlockPos::new(9, 9, 9))),
        );
        for (name, value) in flags {
            r.set_flag(
                crate::core::FlagId::parse(*name).unwrap(),
                FlagEntry::new(value.clone()),
            );
        }
        r
    }

    fn set_at(index: &RegionIndex, pos: BlockPos) -> RegionQuerySet {
        index.query(pos)
    }

    #[test]
    fn notify_sends_greeting_and_farewell_on_set_change() {
        let registry = FlagRegistry::builtin();
        let mut index = RegionIndex::new();
        index.add(flagged_region(
            "inn",
            &[
                ("greeting", FlagValue::Text("welcome".into())),
                ("farewell", FlagValue::Text("bye".into())),
            ],
        ));

        let outside = BlockPos::new(50, 50, 50);
        let inside = BlockPos::new(5, 5, 5);
        let subject = TestSubject::at(outside);
        let mut effects = Recorder::default();
        let mut handler = NotifyHandler::new();

        let set = set_at(&index, outside);
        handler.initialize(&mut TickContext {
            subject: &subject,
            set: &set,
            flags: &registry,
            effects: &mut effects,
            bypassed: false,
        });
        assert!(effects.messages.is_empty());

        let set = set_at(&index, inside);
        handler.tick(&mut TickContext {
            subject: &subject,
            set: &set,
            flags: &registry,
            effects: &mut effects,
            bypassed: false,
        });
        assert_eq!(effects.messages, ["welcome"]);

        // No repeat while the set is unchanged.
        handler.tick(&mut TickContext {
            subject: &subject,
            set: &set,
            flags: &registry,
            effects: &mut effects,
            bypassed: false,
        });
        assert_eq!(effects.messages, ["welcome"]);

        let set = set_at(&index, outside);
        handler.tick(&mut TickContext {
            subject: &subject,
            set: &set,
            flags: &registry,
            effects: &mut effects,
            bypassed: false,
        });
        assert_eq!(effects.messages, ["welcome", "bye"]);
    }

    #[test]
    fn heal_applies_and_throttles() {
        let registry = FlagRegistry::builtin();
        let mut index = RegionIndex::new();
        index.add(flagged_region(
            "fountain",
            &[
                ("heal-amount", FlagValue::Float(2.0)),
                ("heal-delay", FlagValue::Int(3600)),
            ],
        ));
        let pos = BlockPos::new(5, 5, 5);
        let subject = TestSubject::at(pos);
        let mut effects = Recorder::default();
        let mut handler = HealHandler::new();
        let set = set_at(&index, pos);

        for _ in 0..3 {
            handler.tick(&mut TickContext {
                subject: &subject,
                set: &set,
                flags: &registry,
                effects: &mut effects,
                bypassed: false,
            });
        }
        // Only the first tick heals inside the delay window.
        assert_eq!(effects.heals, [2.0]);
    }

    #[test]
    fn heal_skips_bypassing_subjects() {
        let registry = FlagRegistry::builtin();
        let mut index = RegionIndex::new();
        index.add(flagged_region(
            "fountain",
            &[("heal-amount", FlagValue::Float(2.0))],
        ));
        let pos = BlockPos::new(5, 5, 5);
        let subject = TestSubject::at(pos);
        let mut effects = Recorder::default();
        let mut handler = HealHandler::new();
        let set = set_at(&index, pos);

        handler.tick(&mut TickContext {
            subject: &subject,
            set: &set,
            flags: &registry,
            effects: &mut effects,
            bypassed: true,
        });
        assert!(effects.heals.is_empty());
    }

    #[test]
    fn game_mode_forces_and_restores() {
        let registry = FlagRegistry::builtin();
        let mut index = RegionIndex::new();
        index.add(flagged_region(
            "arena",
            &[("game-mode", FlagValue::Text("adventure".into()))],
        ));
        let inside = BlockPos::new(5, 5, 5);
        let outside = BlockPos::new(50, 50, 50);
        let subject = TestSubject::at(inside);
        let mut effects = Recorder::default();
        let mut handler = GameModeHandler::new();

        let set = set_at(&index, inside);
        handler.tick(&mut TickContext {
            subject: &subject,
            set: &set,
            flags: &registry,
            effects: &mut effects,
            bypassed: false,
        });
        assert_eq!(effects.game_modes, ["adventure"]);

        // Unchanged value, no re-application.
        handler.tick(&mut TickContext {
            subject: &subject,
            set: &set,
            flags: &registry,
            effects: &mut effects,
            bypassed: false,
        });
        assert_eq!(effects.game_modes, ["adventure"]);

        let set = set_at(&index, outside);
        handler.tick(&mut TickContext {
            subject: &subject,
            set: &set,
            flags: &registry,
            effects: &mut effects,
            bypassed: false,
        });
        assert_eq!(effects.game_modes, ["adventure", "survival"]);
    }

    #[test]
    fn invincibility_diffs_against_last_applied() {
        let registry = FlagRegistry::builtin();
        let mut index = RegionIndex::new();
        index.add(flagged_region(
            "sanctum",
            &[("invincible", FlagValue::State(State::Allow))],
        ));
        let inside = BlockPos::new(5, 5, 5);
        let outside = BlockPos::new(50, 50, 50);
        let subject = TestSubject::at(inside);
        let mut effects = Recorder::default();
        let mut handler = InvincibilityHandler::new();

        let outside_set = set_at(&index, outside);
        handler.initialize(&mut TickContext {
            subject: &subject,
            set: &outside_set,
            flags: &registry,
            effects: &mut effects,
            bypassed: false,
        });
        assert!(effects.invulnerable.is_empty());

        let inside_set = set_at(&index, inside);
        for _ in 0..2 {
            handler.tick(&mut TickContext {
                subject: &subject,
                set: &inside_set,
                flags: &registry,
                effects: &mut effects,
                bypassed: false,
            });
        }
        handler.tick(&mut TickContext {
            subject: &subject,
            set: &outside_set,
            flags: &registry,
            effects: &mut effects,
            bypassed: false,
        });
        assert_eq!(effects.invulnerable, [true, false]);
    }

    #[test]
    fn time_lock_applies_and_releases() {
        let registry = FlagRegistry::builtin();
        let mut index = RegionIndex::new();
        index.add(flagged_region("night", &[("time-lock", FlagValue::Int(18000))]));
        let inside = BlockPos::new(5, 5, 5);
        let outside = BlockPos::new(50, 50, 50);
        let subject = TestSubject::at(inside);
        let mut effects = Recorder::default();
        let mut handler = TimeLockHandler::new();

        let set = set_at(&index, inside);
        handler.tick(&mut TickContext {
            subject: &subject,
            set: &set,
            flags: &registry,
            effects: &mut effects,
            bypassed: false,
        });
        let set = set_at(&index, outside);
        handler.tick(&mut TickContext {
            subject: &subject,
            set: &set,
            flags: &registry,
            effects: &mut effects,
            bypassed: false,
        });
        assert_eq!(effects.time_locks, [Some(18000), None]);
    }

    #[test]
    fn weather_lock_applies_and_releases() {
        let registry = FlagRegistry::builtin();
        let mut index = RegionIndex::new();
        index.add(flagged_region(
            "storm",
            &[("weather-lock", FlagValue::Text("rain".into()))],
        ));
        let inside = BlockPos::new(5, 5, 5);
        let outside = BlockPos::new(50, 50, 50);
        let subject = TestSubject::at(inside);
        let mut effects = Recorder::default();
        let mut handler = WeatherLockHandler::new();

        let set = set_at(&index, inside);
        handler.tick(&mut TickContext {
            subject: &subject,
            set: &set,
            flags: &registry,
            effects: &mut effects,
            bypassed: false,
        });
        let set = set_at(&index, outside);
        handler.tick(&mut TickContext {
            subject: &subject,
            set: &set,
            flags: &registry,
            effects: &mut effects,
            bypassed: false,
        });
        assert_eq!(
            effects.weather_locks,
            [Some("rain".to_string()), None]
        );
    }
}
