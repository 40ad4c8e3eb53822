//! Debounced re-evaluation triggers
//!
//! Host events (teleports, region edits) can demand a session re-evaluation
//! before the next cadence tick. Firing one per event would stampede during
//! bursts, so triggers coalesce per subject: scheduling keeps the earliest
//! pending deadline, timer threads post completions to an internal channel,
//! and `due` hands back the subjects whose window has closed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};

use crate::core::SubjectId;

const DEFAULT_DELAY: Duration = Duration::from_millis(100);

/// Per-subject trigger coalescing between cadence ticks.
pub struct ReevalScheduler {
    /// Pending triggers: subject -> earliest scheduled fire time.
    pending: HashMap<SubjectId, Instant>,
    delay: Duration,
    timer_tx: Sender<SubjectId>,
    timer_rx: Receiver<SubjectId>,
}

impl Default for ReevalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ReevalScheduler {
    pub fn new() -> Self {
        Self::with_delay(DEFAULT_DELAY)
    }

    pub fn with_delay(delay: Duration) -> Self {
        let (timer_tx, timer_rx) = channel::unbounded();
        Self {
            pending: HashMap::new(),
            delay,
            timer_tx,
            timer_rx,
        }
    }

    /// Request a re-evaluation after the coalescing delay.
    pub fn schedule(&mut self, subject: SubjectId) {
        self.schedule_after(subject, self.delay);
    }

    /// Request a re-evaluation after a specific delay. An earlier pending
    /// deadline for the subject wins; a later one is pulled in.
    pub fn schedule_after(&mut self, subject: SubjectId, delay: Duration) {
        let fire_at = Instant::now() + delay;
        if self.pending.get(&subject).is_some_and(|&at| at <= fire_at) {
            return;
        }
        self.pending.insert(subject, fire_at);

        let tx = self.timer_tx.clone();
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            // The receiver may be gone during shutdown.
            let _ = tx.send(subject);
        });
    }

    /// Drain timer completions, consuming and returning the triggers whose
    /// deadline has passed. Completions for cancelled or superseded triggers
    /// are dropped.
    pub fn due(&mut self) -> Vec<SubjectId> {
        let now = Instant::now();
        let mut fired = Vec::new();
        for subject in self.timer_rx.try_iter() {
            if self.pending.get(&subject).is_some_and(|&at| at <= now) {
                self.pending.remove(&subject);
                fired.push(subject);
            }
        }
        fired
    }

    pub fn cancel(&mut self, subject: SubjectId) {
        self.pending.remove(&subject);
    }

    pub fn is_pending(&self, subject: SubjectId) -> bool {
        self.pending.contains_key(&subject)
    }
}
